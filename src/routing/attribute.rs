use crate::{
    ingestion::points::AttributePoint,
    network::MergedNetwork,
    routing::AccessibilityError,
    structures::NodeID,
};

/// Named non-negative scalar per node of a merged network; nodes without a
/// value hold 0.
#[derive(Debug, Clone)]
pub struct NodeAttribute {
    name: String,
    values: Vec<f64>,
}

impl NodeAttribute {
    pub fn new(name: &str, network: &MergedNetwork) -> Self {
        NodeAttribute {
            name: name.to_string(),
            values: vec![0.0; network.graph().node_count()],
        }
    }

    /// Adds `value` to the node; values landing on one node accumulate.
    pub fn add(&mut self, node: NodeID, value: f64) -> Result<(), AccessibilityError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AccessibilityError::AttributeValueError(value));
        }
        let slot = self
            .values
            .get_mut(node.0)
            .ok_or(AccessibilityError::UnknownNodeError(node))?;
        *slot += value;
        Ok(())
    }

    /// Attaches every point to its nearest node of the network.
    pub fn from_points(
        name: &str,
        network: &MergedNetwork,
        points: &[AttributePoint],
    ) -> Result<Self, AccessibilityError> {
        let mut attribute = Self::new(name, network);
        let mut unplaced = 0;
        for point in points {
            match network
                .graph()
                .nearest_node(point.lat_lng.latitude, point.lat_lng.longitude)
            {
                Some(node) => attribute.add(node, point.value)?,
                None => unplaced += 1,
            }
        }
        if unplaced > 0 {
            tracing::warn!("{unplaced} points could not be placed on the network");
        }
        tracing::info!(
            "set '{name}' on {} nodes, total {}",
            attribute.values.iter().filter(|v| **v > 0.0).count(),
            attribute.values.iter().sum::<f64>()
        );
        Ok(attribute)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, node: NodeID) -> f64 {
        self.values.get(node.0).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
