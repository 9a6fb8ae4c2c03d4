use crate::structures::{
    EdgeData, Graph, GraphError, LatLng, NodeData, NodeID, NodeOrigin, StreetEdgeData,
};

const METRES_PER_MILE: f64 = 1609.344;

/// Minutes needed to walk `length_m` metres at `speed_mph`.
pub fn walk_minutes(length_m: f64, speed_mph: f64) -> f64 {
    length_m / (speed_mph * METRES_PER_MILE / 60.0)
}

/// Walkable street network, every street usable in both directions.
pub struct PedestrianNetwork {
    graph: Graph,
    walk_speed_mph: f64,
}

impl PedestrianNetwork {
    pub fn new(walk_speed_mph: f64) -> Self {
        PedestrianNetwork {
            graph: Graph::new(),
            walk_speed_mph,
        }
    }

    pub fn add_node(&mut self, eid: String, lat_lng: LatLng) -> Result<NodeID, GraphError> {
        self.graph.add_node(NodeData {
            eid,
            lat_lng,
            origin: NodeOrigin::Pedestrian,
        })
    }

    /// Adds the street in both directions, weighted by walking time.
    pub fn add_street(&mut self, a: NodeID, b: NodeID) -> Result<(), GraphError> {
        let (from, to) = match (self.graph.get_node(a), self.graph.get_node(b)) {
            (Some(from), Some(to)) => (from.loc(), to.loc()),
            (None, _) => return Err(GraphError::NodeNotFoundError(a)),
            (_, None) => return Err(GraphError::NodeNotFoundError(b)),
        };
        let distance = from.dist(to);
        let weight = walk_minutes(distance, self.walk_speed_mph);

        for (origin, destination) in [(a, b), (b, a)] {
            self.graph.add_edge(EdgeData::Street(StreetEdgeData {
                origin,
                destination,
                length: distance as usize,
                weight,
            }))?;
        }
        Ok(())
    }

    pub fn get_id(&self, eid: &str) -> Option<NodeID> {
        self.graph.get_id(eid)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn walk_speed_mph(&self) -> f64 {
        self.walk_speed_mph
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_walk_minutes_at_three_mph() {
        // one mile at 3 mph is 20 minutes
        assert!((walk_minutes(METRES_PER_MILE, 3.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_streets_are_bidirectional() {
        let mut net = PedestrianNetwork::new(3.0);
        let a = net
            .add_node(
                "osm#1".to_string(),
                LatLng {
                    latitude: 43.0,
                    longitude: -89.4,
                },
            )
            .unwrap();
        let b = net
            .add_node(
                "osm#2".to_string(),
                LatLng {
                    latitude: 43.001,
                    longitude: -89.4,
                },
            )
            .unwrap();
        net.add_street(a, b).unwrap();

        let g = net.graph();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edges_from(a)[0].destination(), b);
        assert_eq!(g.edges_from(b)[0].destination(), a);
        assert_eq!(g.edges_from(a)[0].weight(), g.edges_from(b)[0].weight());
        assert!(net.add_street(a, NodeID(9)).is_err());
    }
}
