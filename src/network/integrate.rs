use std::fmt::Display;

use crate::{
    network::{PedestrianNetwork, TransitNetwork, walk_minutes},
    structures::{ConnectorEdgeData, EdgeData, Graph, GraphError, NodeID},
};

/// Lower bound on connector weight, in minutes.
const MIN_CONNECTOR_WEIGHT: f64 = 0.01;

/// A transit stop with no pedestrian node within the snap distance. It stays
/// in the merged graph but can only be reached by transit.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedNodeWarning {
    pub node: NodeID,
    pub eid: String,
    pub nearest_distance_m: Option<f64>,
}

impl Display for IsolatedNodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.nearest_distance_m {
            Some(d) => write!(
                f,
                "transit node {} ({}) is {d:.0}m from the nearest pedestrian node",
                self.eid, self.node
            ),
            None => write!(
                f,
                "transit node {} ({}) has no pedestrian node to connect to",
                self.eid, self.node
            ),
        }
    }
}

/// Transit and pedestrian nodes in one graph, joined by connector edges.
pub struct MergedNetwork {
    graph: Graph,
    connectors: usize,
    isolated: Vec<IsolatedNodeWarning>,
}

impl MergedNetwork {
    /// Wraps an already integrated graph.
    #[cfg(test)]
    pub(crate) fn from_graph(graph: Graph) -> Self {
        let connectors = graph
            .edges()
            .filter(|e| e.kind() == crate::structures::EdgeOrigin::Connector)
            .count();
        MergedNetwork {
            graph,
            connectors,
            isolated: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of connector edges, counting each direction.
    pub fn connector_count(&self) -> usize {
        self.connectors
    }

    pub fn isolated(&self) -> &[IsolatedNodeWarning] {
        &self.isolated
    }
}

fn copy_into(target: &mut Graph, source: &Graph) -> Result<Vec<NodeID>, GraphError> {
    let mut mapping = Vec::with_capacity(source.node_count());
    for (_, node) in source.nodes() {
        mapping.push(target.add_node(node.clone())?);
    }
    for edge in source.edges() {
        let origin = mapping[edge.origin().0];
        let destination = mapping[edge.destination().0];
        target.add_edge(edge.remapped(origin, destination))?;
    }
    Ok(mapping)
}

/// Unions both networks under fresh node ids and links every transit stop to
/// its nearest pedestrian node when that node lies within `snap_distance_m`.
pub fn integrate(
    transit: TransitNetwork,
    pedestrian: PedestrianNetwork,
    snap_distance_m: f64,
) -> Result<MergedNetwork, GraphError> {
    let mut graph = Graph::new();
    let pedestrian_ids = copy_into(&mut graph, pedestrian.graph())?;
    let transit_ids = copy_into(&mut graph, transit.graph())?;

    let mut connectors = 0;
    let mut isolated = Vec::new();
    for (old_id, node) in transit.graph().nodes() {
        let id = transit_ids[old_id.0];
        let loc = node.loc();
        let nearest = pedestrian
            .graph()
            .nearest_node_dist(loc.latitude, loc.longitude);

        let (distance, walk_node) = match nearest {
            Some((d, walk_node)) if d <= snap_distance_m => (d, pedestrian_ids[walk_node.0]),
            _ => {
                let warning = IsolatedNodeWarning {
                    node: id,
                    eid: node.eid.clone(),
                    nearest_distance_m: nearest.map(|(d, _)| d),
                };
                tracing::warn!("{warning}");
                isolated.push(warning);
                continue;
            }
        };

        let weight = walk_minutes(distance, pedestrian.walk_speed_mph()).max(MIN_CONNECTOR_WEIGHT);
        for (origin, destination) in [(id, walk_node), (walk_node, id)] {
            graph.add_edge(EdgeData::Connector(ConnectorEdgeData {
                origin,
                destination,
                length: distance as usize,
                weight,
            }))?;
            connectors += 1;
        }
    }

    tracing::info!(
        "merged network: {} nodes, {} edges, {} connectors, {} isolated transit nodes",
        graph.node_count(),
        graph.edge_count(),
        connectors,
        isolated.len()
    );

    Ok(MergedNetwork {
        graph,
        connectors,
        isolated,
    })
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        network::create_transit_network,
        schedule::{
            ScheduleTables, StopRecord, StopTimeRecord, TimeWindow, TripScheduleRecord,
            parse_time, time_difference,
        },
        structures::{EdgeOrigin, LatLng},
    };

    fn loc(lat: f64, lon: f64) -> LatLng {
        LatLng {
            latitude: lat,
            longitude: lon,
        }
    }

    fn transit() -> TransitNetwork {
        let stop = |id: &str, l: LatLng| StopRecord {
            feed: "madison".to_string(),
            stop_id: id.to_string(),
            name: None,
            lat_lng: l,
        };
        let st = |stop: &str, seq: u32, t: &str| StopTimeRecord {
            feed: "madison".to_string(),
            trip_id: "a".to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_time: Some(parse_time(t).unwrap()),
            departure_time: Some(parse_time(t).unwrap()),
            is_interpolated: false,
            time_from_previous: None,
        };
        let tables = ScheduleTables {
            stops: vec![
                stop("near", loc(43.0001, -89.4)),
                stop("far", loc(43.2, -89.4)),
            ],
            trips: vec![TripScheduleRecord {
                feed: "madison".to_string(),
                trip_id: "a".to_string(),
                route_id: "2".to_string(),
                direction_id: None,
                service_id: "weekday".to_string(),
                unique_agency_id: "metro_madison".to_string(),
            }],
            stop_times_int: time_difference(vec![
                st("near", 0, "08:00:00"),
                st("far", 1, "08:20:00"),
            ]),
            ..Default::default()
        };
        let window = TimeWindow::parse("07:00:00", "10:00:00").unwrap();
        create_transit_network(&tables, window).unwrap().0
    }

    fn pedestrian() -> PedestrianNetwork {
        let mut net = PedestrianNetwork::new(3.0);
        let a = net.add_node("osm#1".to_string(), loc(43.0, -89.4)).unwrap();
        let b = net.add_node("osm#2".to_string(), loc(43.001, -89.4)).unwrap();
        net.add_street(a, b).unwrap();
        net
    }

    #[test]
    fn test_merge_unions_and_connects() {
        let merged = integrate(transit(), pedestrian(), 200.0).unwrap();
        let g = merged.graph();

        assert_eq!(g.node_count(), 4);
        // 2 street + 1 transit + 2 connector
        assert_eq!(g.edge_count(), 5);
        assert_eq!(merged.connector_count(), 2);

        let eids: HashSet<&str> = g.nodes().map(|(_, n)| n.eid.as_str()).collect();
        assert_eq!(eids.len(), g.node_count());

        for edge in g.edges() {
            assert!(g.contains(edge.origin()));
            assert!(g.contains(edge.destination()));
        }

        let near = g.get_id("transit#madison#near").unwrap();
        let osm1 = g.get_id("osm#1").unwrap();
        assert!(
            g.edges_from(near)
                .iter()
                .any(|e| e.kind() == EdgeOrigin::Connector && e.destination() == osm1)
        );
        assert!(
            g.edges_from(osm1)
                .iter()
                .any(|e| e.kind() == EdgeOrigin::Connector && e.destination() == near)
        );
    }

    #[test]
    fn test_unsnapped_stop_is_reported() {
        let merged = integrate(transit(), pedestrian(), 200.0).unwrap();
        let isolated = merged.isolated();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].eid, "transit#madison#far");
        assert!(isolated[0].nearest_distance_m.unwrap() > 20_000.0);
        assert!(merged.graph().contains(isolated[0].node));
    }

    #[test]
    fn test_connector_weight_is_never_zero() {
        let mut net = PedestrianNetwork::new(3.0);
        net.add_node("osm#1".to_string(), loc(43.0001, -89.4)).unwrap();
        let merged = integrate(transit(), net, 200.0).unwrap();
        let connector = merged
            .graph()
            .edges()
            .find(|e| e.kind() == EdgeOrigin::Connector)
            .unwrap();
        assert_eq!(connector.weight(), MIN_CONNECTOR_WEIGHT);
    }
}
