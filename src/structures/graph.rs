use std::collections::HashMap;

use kdtree::{KdTree, distance::squared_euclidean};

use crate::structures::{EdgeData, LatLng, NodeData, NodeID};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("edge endpoint {0} is not a node of the graph")]
    NodeNotFoundError(NodeID),
    #[error("node id '{0}' is already present in the graph")]
    DuplicateNodeError(String),
    #[error("node '{0}' has non-finite coordinates")]
    NonFiniteCoordinateError(String),
}

/// Directed, weighted adjacency-list graph with a spatial index over every node.
pub struct Graph {
    nodes: Vec<NodeData>,
    edges: Vec<Vec<EdgeData>>,
    nodes_tree: KdTree<f64, NodeID, [f64; 2]>,
    id_mapper: HashMap<String, NodeID>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Graph {
        Graph {
            nodes: Vec::new(),
            edges: Vec::new(),
            nodes_tree: KdTree::new(2),
            id_mapper: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeData) -> Result<NodeID, GraphError> {
        if self.id_mapper.contains_key(&node.eid) {
            return Err(GraphError::DuplicateNodeError(node.eid));
        }
        if !node.lat_lng.is_finite() {
            return Err(GraphError::NonFiniteCoordinateError(node.eid));
        }

        let id = NodeID(self.nodes.len());
        let lat = node.lat_lng.latitude;
        let lon = node.lat_lng.longitude;

        self.nodes_tree
            .add([lat, lon], id)
            .map_err(|_| GraphError::NonFiniteCoordinateError(node.eid.clone()))?;
        self.id_mapper.insert(node.eid.clone(), id);
        self.nodes.push(node);
        self.edges.push(Vec::new());

        Ok(id)
    }

    /// Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: EdgeData) -> Result<(), GraphError> {
        let from = edge.origin();
        let to = edge.destination();
        if to.0 >= self.nodes.len() {
            return Err(GraphError::NodeNotFoundError(to));
        }
        match self.edges.get_mut(from.0) {
            Some(adjacent) => {
                adjacent.push(edge);
                Ok(())
            }
            None => Err(GraphError::NodeNotFoundError(from)),
        }
    }

    pub fn get_id(&self, eid: &str) -> Option<NodeID> {
        self.id_mapper.get(eid).copied()
    }

    pub fn get_node(&self, id: NodeID) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: NodeID) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &NodeData)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeID(i), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeData> {
        self.edges.iter().flatten()
    }

    pub fn edges_from(&self, id: NodeID) -> &[EdgeData] {
        match self.edges.get(id.0) {
            Some(adjacent) => adjacent,
            None => &[],
        }
    }

    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<NodeID> {
        match self.nodes_tree.nearest(&[lat, lon], 1, &squared_euclidean) {
            Ok(found) => found.first().map(|(_, id)| **id),
            Err(e) => {
                tracing::debug!("nearest node lookup failed at ({lat}, {lon}): {e:?}");
                None
            }
        }
    }

    /// Nearest node with its haversine distance in metres.
    pub fn nearest_node_dist(&self, lat: f64, lon: f64) -> Option<(f64, NodeID)> {
        match self.nodes_tree.iter_nearest(&[lat, lon], &LatLng::distance) {
            Ok(mut it) => it.next().map(|(d, id)| (d, *id)),
            Err(e) => {
                tracing::debug!("nearest node lookup failed at ({lat}, {lon}): {e:?}");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structures::{NodeOrigin, StreetEdgeData};

    fn node(eid: &str, lat: f64, lon: f64) -> NodeData {
        NodeData {
            eid: eid.to_string(),
            lat_lng: LatLng {
                latitude: lat,
                longitude: lon,
            },
            origin: NodeOrigin::Pedestrian,
        }
    }

    fn street(origin: NodeID, destination: NodeID) -> EdgeData {
        EdgeData::Street(StreetEdgeData {
            origin,
            destination,
            length: 10,
            weight: 0.1,
        })
    }

    #[test]
    fn test_add_edge_rejects_unknown_endpoints() {
        let mut g = Graph::new();
        let a = g.add_node(node("osm#1", 43.0, -89.0)).unwrap();
        assert_eq!(
            g.add_edge(street(a, NodeID(7))),
            Err(GraphError::NodeNotFoundError(NodeID(7)))
        );
        assert_eq!(
            g.add_edge(street(NodeID(3), a)),
            Err(GraphError::NodeNotFoundError(NodeID(3)))
        );
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_eid_is_rejected() {
        let mut g = Graph::new();
        g.add_node(node("osm#1", 43.0, -89.0)).unwrap();
        assert_eq!(
            g.add_node(node("osm#1", 43.1, -89.1)).unwrap_err(),
            GraphError::DuplicateNodeError("osm#1".to_string())
        );
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_nearest_node_dist() {
        let mut g = Graph::new();
        let a = g.add_node(node("osm#1", 43.0, -89.0)).unwrap();
        let b = g.add_node(node("osm#2", 43.01, -89.0)).unwrap();
        g.add_edge(street(a, b)).unwrap();
        g.add_edge(street(b, a)).unwrap();

        let (d, id) = g.nearest_node_dist(43.009, -89.0).unwrap();
        assert_eq!(id, b);
        assert!(d < 150.0);
        assert_eq!(g.nearest_node(43.001, -89.0), Some(a));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.get_id("osm#2"), Some(b));
    }
}
