use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::structures::LatLng;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeOrigin {
    Transit,
    Pedestrian,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// External id, unique across every source network (`osm#...`, `transit#...`).
    pub eid: String,
    pub lat_lng: LatLng,
    pub origin: NodeOrigin,
}

impl NodeData {
    pub fn loc(&self) -> LatLng {
        self.lat_lng
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeID(pub usize);

impl Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
