use serde::{Deserialize, Serialize};

use crate::structures::NodeID;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeOrigin {
    Transit,
    Pedestrian,
    Connector,
}

/// Edge weights are travel costs in minutes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EdgeData {
    Street(StreetEdgeData),
    Transit(TransitEdgeData),
    Connector(ConnectorEdgeData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetEdgeData {
    pub origin: NodeID,
    pub destination: NodeID,
    /// metres
    pub length: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitEdgeData {
    pub origin: NodeID,
    pub destination: NodeID,
    pub route_id: String,
    pub direction_id: Option<u8>,
    /// mean in-vehicle time, minutes
    pub ride_time: f64,
    /// mean headway at the boarding stop, minutes
    pub mean_headway: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorEdgeData {
    pub origin: NodeID,
    pub destination: NodeID,
    pub length: usize,
    pub weight: f64,
}

impl EdgeData {
    pub fn origin(&self) -> NodeID {
        match self {
            EdgeData::Street(e) => e.origin,
            EdgeData::Transit(e) => e.origin,
            EdgeData::Connector(e) => e.origin,
        }
    }

    pub fn destination(&self) -> NodeID {
        match self {
            EdgeData::Street(e) => e.destination,
            EdgeData::Transit(e) => e.destination,
            EdgeData::Connector(e) => e.destination,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            EdgeData::Street(e) => e.weight,
            EdgeData::Transit(e) => e.weight,
            EdgeData::Connector(e) => e.weight,
        }
    }

    pub fn kind(&self) -> EdgeOrigin {
        match self {
            EdgeData::Street(_) => EdgeOrigin::Pedestrian,
            EdgeData::Transit(_) => EdgeOrigin::Transit,
            EdgeData::Connector(_) => EdgeOrigin::Connector,
        }
    }

    /// Same edge with its endpoints renumbered, used when copying between graphs.
    pub fn remapped(&self, origin: NodeID, destination: NodeID) -> EdgeData {
        let mut edge = self.clone();
        match &mut edge {
            EdgeData::Street(e) => {
                e.origin = origin;
                e.destination = destination;
            }
            EdgeData::Transit(e) => {
                e.origin = origin;
                e.destination = destination;
            }
            EdgeData::Connector(e) => {
                e.origin = origin;
                e.destination = destination;
            }
        }
        edge
    }
}
