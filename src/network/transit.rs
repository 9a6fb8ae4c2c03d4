use std::collections::{BTreeMap, HashMap};

use crate::{
    schedule::{ScheduleTables, TimeWindow},
    structures::{EdgeData, Graph, GraphError, NodeData, NodeID, NodeOrigin, TransitEdgeData},
};

/// Stop-to-stop transit graph for one service day and time window.
pub struct TransitNetwork {
    graph: Graph,
}

#[derive(Debug, Default)]
pub struct TransitReport {
    pub segments: usize,
    pub segments_outside_window: usize,
    pub segments_missing_stop: usize,
    pub segments_missing_trip: usize,
    pub edges: usize,
    pub edges_without_headway: usize,
}

type SegmentKey<'a> = (&'a str, &'a str, &'a str, &'a str, Option<u8>);

pub fn transit_eid(feed: &str, stop_id: &str) -> String {
    format!("transit#{feed}#{stop_id}")
}

/// Builds transit edges from consecutive interpolated stop times departing
/// inside `window`. Parallel trips of a route and direction collapse into one
/// edge weighted by mean ride time plus half the mean headway at the boarding
/// stop; without a headway, half the window length is used.
pub fn create_transit_network(
    tables: &ScheduleTables,
    window: TimeWindow,
) -> Result<(TransitNetwork, TransitReport), GraphError> {
    let trips: HashMap<(&str, &str), (&str, Option<u8>)> = tables
        .trips
        .iter()
        .map(|t| {
            (
                (t.feed.as_str(), t.trip_id.as_str()),
                (t.route_id.as_str(), t.direction_id),
            )
        })
        .collect();
    let stops: HashMap<(&str, &str), _> = tables
        .stops
        .iter()
        .map(|s| ((s.feed.as_str(), s.stop_id.as_str()), s))
        .collect();
    let headways: HashMap<(&str, &str, Option<u8>, &str), f64> = tables
        .headways
        .iter()
        .map(|h| {
            (
                (
                    h.feed.as_str(),
                    h.route_id.as_str(),
                    h.direction_id,
                    h.stop_id.as_str(),
                ),
                h.mean_headway_seconds,
            )
        })
        .collect();

    let mut report = TransitReport::default();
    let mut segments: BTreeMap<SegmentKey, Vec<u32>> = BTreeMap::new();

    for pair in tables.stop_times_int.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        if from.feed != to.feed || from.trip_id != to.trip_id {
            continue;
        }
        report.segments += 1;

        let (Some(departure), Some(arrival)) = (from.departure_time, to.arrival_time) else {
            continue;
        };
        if !window.contains(departure) {
            report.segments_outside_window += 1;
            continue;
        }
        let Some(&(route_id, direction_id)) = trips.get(&(from.feed.as_str(), from.trip_id.as_str()))
        else {
            report.segments_missing_trip += 1;
            continue;
        };
        if !stops.contains_key(&(from.feed.as_str(), from.stop_id.as_str()))
            || !stops.contains_key(&(to.feed.as_str(), to.stop_id.as_str()))
        {
            report.segments_missing_stop += 1;
            continue;
        }

        let ride = to
            .time_from_previous
            .unwrap_or_else(|| arrival.saturating_sub(departure));
        segments
            .entry((
                from.feed.as_str(),
                from.stop_id.as_str(),
                to.stop_id.as_str(),
                route_id,
                direction_id,
            ))
            .or_default()
            .push(ride);
    }

    let mut graph = Graph::new();
    let mut node_ids: HashMap<(&str, &str), NodeID> = HashMap::new();
    for &(feed, from_stop, to_stop, _, _) in segments.keys() {
        for stop_id in [from_stop, to_stop] {
            if node_ids.contains_key(&(feed, stop_id)) {
                continue;
            }
            if let Some(stop) = stops.get(&(feed, stop_id)) {
                let id = graph.add_node(NodeData {
                    eid: transit_eid(feed, stop_id),
                    lat_lng: stop.lat_lng,
                    origin: NodeOrigin::Transit,
                })?;
                node_ids.insert((feed, stop_id), id);
            }
        }
    }

    for ((feed, from_stop, to_stop, route_id, direction_id), rides) in segments {
        let (Some(&origin), Some(&destination)) = (
            node_ids.get(&(feed, from_stop)),
            node_ids.get(&(feed, to_stop)),
        ) else {
            continue;
        };

        let ride_time = rides.iter().map(|&r| r as f64).sum::<f64>() / rides.len() as f64 / 60.0;
        let mean_headway = headways
            .get(&(feed, route_id, direction_id, from_stop))
            .map(|h| h / 60.0);
        let wait = match mean_headway {
            Some(h) => h / 2.0,
            None => {
                report.edges_without_headway += 1;
                window.length() as f64 / 2.0 / 60.0
            }
        };

        graph.add_edge(EdgeData::Transit(TransitEdgeData {
            origin,
            destination,
            route_id: route_id.to_string(),
            direction_id,
            ride_time,
            mean_headway,
            weight: ride_time + wait,
        }))?;
        report.edges += 1;
    }

    tracing::info!(
        "transit network: {} nodes, {} edges from {} segments",
        graph.node_count(),
        report.edges,
        report.segments
    );
    tracing::info!(
        " - {} segments departing outside {window}",
        report.segments_outside_window
    );
    if report.segments_missing_stop + report.segments_missing_trip > 0 {
        tracing::warn!(
            "{} segments reference unknown stops, {} unknown trips",
            report.segments_missing_stop,
            report.segments_missing_trip
        );
    }
    if report.edges_without_headway > 0 {
        tracing::warn!(
            "{} transit edges have no headway, using half the window as wait",
            report.edges_without_headway
        );
    }

    Ok((TransitNetwork { graph }, report))
}

impl TransitNetwork {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn stop_node(&self, feed: &str, stop_id: &str) -> Option<NodeID> {
        self.graph.get_id(&transit_eid(feed, stop_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        schedule::{
            HeadwayRecord, StopRecord, StopTimeRecord, TripScheduleRecord, parse_time,
            time_difference,
        },
        structures::LatLng,
    };

    fn stop(id: &str, lat: f64) -> StopRecord {
        StopRecord {
            feed: "madison".to_string(),
            stop_id: id.to_string(),
            name: None,
            lat_lng: LatLng {
                latitude: lat,
                longitude: -89.4,
            },
        }
    }

    fn trip(id: &str) -> TripScheduleRecord {
        TripScheduleRecord {
            feed: "madison".to_string(),
            trip_id: id.to_string(),
            route_id: "2".to_string(),
            direction_id: Some(0),
            service_id: "weekday".to_string(),
            unique_agency_id: "metro_madison".to_string(),
        }
    }

    fn st(trip: &str, stop: &str, seq: u32, time: &str) -> StopTimeRecord {
        let t = Some(parse_time(time).unwrap());
        StopTimeRecord {
            feed: "madison".to_string(),
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_time: t,
            departure_time: t,
            is_interpolated: false,
            time_from_previous: None,
        }
    }

    fn tables() -> ScheduleTables {
        let stop_times_int = time_difference(vec![
            st("a", "s1", 0, "08:00:00"),
            st("a", "s2", 1, "08:04:00"),
            st("b", "s1", 0, "08:10:00"),
            st("b", "s2", 1, "08:16:00"),
            st("c", "s1", 0, "11:00:00"),
            st("c", "s2", 1, "11:05:00"),
        ]);
        ScheduleTables {
            stops: vec![stop("s1", 43.0), stop("s2", 43.01)],
            trips: vec![trip("a"), trip("b"), trip("c")],
            stop_times_int,
            headways: vec![HeadwayRecord {
                feed: "madison".to_string(),
                unique_agency_id: "metro_madison".to_string(),
                route_id: "2".to_string(),
                direction_id: Some(0),
                stop_id: "s1".to_string(),
                window: TimeWindow::parse("07:00:00", "10:00:00").unwrap(),
                headway_count: 1,
                mean_headway_seconds: 600.0,
                std_headway_seconds: None,
                min_headway_seconds: 600,
                max_headway_seconds: 600,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_edge_weight_is_ride_plus_half_headway() {
        let window = TimeWindow::parse("07:00:00", "10:00:00").unwrap();
        let (net, report) = create_transit_network(&tables(), window).unwrap();

        assert_eq!(report.segments, 3);
        assert_eq!(report.segments_outside_window, 1);
        assert_eq!(report.edges, 1);

        let s1 = net.stop_node("madison", "s1").unwrap();
        let s2 = net.stop_node("madison", "s2").unwrap();
        let edges = net.graph().edges_from(s1);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].destination(), s2);
        match &edges[0] {
            EdgeData::Transit(e) => {
                assert_eq!(e.ride_time, 5.0);
                assert_eq!(e.mean_headway, Some(10.0));
                assert_eq!(e.weight, 10.0);
            }
            other => panic!("unexpected edge {other:?}"),
        }
    }

    #[test]
    fn test_missing_headway_falls_back_to_half_window() {
        let window = TimeWindow::parse("07:00:00", "10:00:00").unwrap();
        let tables = ScheduleTables {
            headways: Vec::new(),
            ..tables()
        };
        let (net, report) = create_transit_network(&tables, window).unwrap();
        assert_eq!(report.edges_without_headway, 1);
        let edge = net.graph().edges().next().unwrap();
        assert_eq!(edge.weight(), 5.0 + 90.0);
    }
}
