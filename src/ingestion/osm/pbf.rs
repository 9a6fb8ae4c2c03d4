use std::collections::HashSet;

use osmpbf::{Element, ElementReader, Way};

use crate::{
    ingestion::IngestionError,
    network::PedestrianNetwork,
    structures::{BoundingBox, LatLng},
};

fn osm_eid(id: i64) -> String {
    format!("osm#{id}")
}

/// Builds the walk network from an OSM PBF extract, keeping nodes inside
/// `bbox` and streets whose two ends were kept.
pub fn load_pbf_file(
    pbf_path: &str,
    bbox: &BoundingBox,
    walk_speed_mph: f64,
) -> Result<PedestrianNetwork, IngestionError> {
    let mut net = PedestrianNetwork::new(walk_speed_mph);

    let reader = ElementReader::from_path(pbf_path)?;
    let mut valid_node_ids = HashSet::new();
    let mut valid_way_ids = HashSet::<i64>::new();

    reader.for_each(|element| {
        if let Element::Way(w) = element {
            if !is_walkable(&w) {
                return;
            }

            valid_way_ids.insert(w.id());
            valid_node_ids.extend(w.refs());
        }
    })?;

    let mut outside = 0;
    let mut rejected = 0;
    let mut add_node = |net: &mut PedestrianNetwork, id: i64, lat: f64, lon: f64| {
        let lat_lng = LatLng {
            latitude: lat,
            longitude: lon,
        };
        if !bbox.contains(lat_lng) {
            outside += 1;
            return;
        }
        if let Err(e) = net.add_node(osm_eid(id), lat_lng) {
            tracing::debug!("skipping osm node {id}: {e}");
            rejected += 1;
        }
    };

    let reader = ElementReader::from_path(pbf_path)?;
    reader.for_each(|element| match element {
        Element::DenseNode(n) if valid_node_ids.contains(&n.id()) => {
            add_node(&mut net, n.id(), n.lat(), n.lon());
        }
        Element::Node(n) if valid_node_ids.contains(&n.id()) => {
            add_node(&mut net, n.id(), n.lat(), n.lon());
        }
        _ => {}
    })?;

    let reader = ElementReader::from_path(pbf_path)?;

    let mut n = 0;
    let mut failed = 0;

    reader.for_each(|element| {
        if let Element::Way(w) = element {
            if valid_way_ids.contains(&w.id()) {
                let node_ids = w.refs().collect::<Vec<_>>();

                for pair in node_ids.windows(2) {
                    n += 1;
                    let ends = (
                        net.get_id(&osm_eid(pair[0])),
                        net.get_id(&osm_eid(pair[1])),
                    );
                    let inserted = match ends {
                        (Some(from), Some(to)) => net.add_street(from, to).is_ok(),
                        _ => false,
                    };
                    if !inserted {
                        failed += 1;
                    }
                }
            }
        }
    })?;

    tracing::info!(
        "walk network: {} nodes ({} outside the bounding box, {} rejected)",
        net.graph().node_count(),
        outside,
        rejected
    );
    tracing::info!(
        "imported {} street segments out of {} ({} with an end outside the network)",
        n - failed,
        n,
        failed
    );

    Ok(net)
}

fn is_walkable(way: &Way) -> bool {
    let highway = way.tags().find(|tag| tag.0 == "highway").map(|tag| tag.1);
    if !matches!(
        highway,
        Some(
            "primary"
                | "secondary"
                | "tertiary"
                | "unclassified"
                | "residential"
                | "service"
                | "living_street"
                | "primary_link"
                | "secondary_link"
                | "tertiary_link"
                | "footway"
                | "cycleway"
                | "bridleway"
                | "path"
                | "track"
                | "pedestrian"
                | "steps"
                | "crossing"
        )
    ) {
        return false;
    }

    let access = way.tags().find(|tag| tag.0 == "access").map(|tag| tag.1);
    if matches!(access, Some("no" | "private")) {
        return false;
    }

    let foot = way.tags().find(|tag| tag.0 == "foot").map(|tag| tag.1);
    !matches!(foot, Some("no"))
}
