use std::{
    cmp::{Ordering, Reverse},
    collections::HashSet,
    fmt::Display,
};

use priority_queue::PriorityQueue;
use rayon::prelude::*;
use serde::Deserialize;

use crate::{
    network::MergedNetwork,
    routing::NodeAttribute,
    structures::{Graph, NodeID},
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AccessibilityError {
    #[error("aggregation radius must be a finite, non-negative cost, got {0}")]
    AggregationRadiusError(f64),
    #[error("attribute values must be finite and non-negative, got {0}")]
    AttributeValueError(f64),
    #[error("node {0} is not part of the network")]
    UnknownNodeError(NodeID),
    #[error("attribute has {0} values but the network has {1} nodes")]
    AttributeSizeError(usize, usize),
}

/// Weight given to a destination reached at `cost` within `radius`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decay {
    /// 1 at cost 0 down to 0 at the radius.
    #[default]
    Linear,
    /// 1 everywhere inside the radius.
    Flat,
    /// `exp(-cost / radius)`.
    Exponential,
}

impl Decay {
    pub fn weight(&self, cost: f64, radius: f64) -> f64 {
        if radius <= 0.0 {
            return 1.0;
        }
        match self {
            Decay::Linear => (1.0 - cost / radius).max(0.0),
            Decay::Flat => 1.0,
            Decay::Exponential => (-cost / radius).exp(),
        }
    }
}

impl Display for Decay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Decay::Linear => "linear",
            Decay::Flat => "flat",
            Decay::Exponential => "exponential",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Aggregated value per node for one radius.
#[derive(Debug, Clone)]
pub struct Accessibility {
    pub radius: f64,
    pub decay: Decay,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessibilitySummary {
    pub radius: f64,
    pub max: f64,
    pub mean: f64,
    pub min: f64,
    pub nonzero: usize,
}

impl Display for AccessibilitySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "radius {}: max {:.3}, mean {:.3}, min {:.3}, {} nonzero",
            self.radius, self.max, self.mean, self.min, self.nonzero
        )
    }
}

impl Accessibility {
    pub fn get(&self, node: NodeID) -> Option<f64> {
        self.values.get(node.0).copied()
    }

    pub fn summary(&self) -> AccessibilitySummary {
        let n = self.values.len();
        let (min, max, sum) = self.values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        AccessibilitySummary {
            radius: self.radius,
            max: if n == 0 { 0.0 } else { max },
            mean: if n == 0 { 0.0 } else { sum / n as f64 },
            min: if n == 0 { 0.0 } else { min },
            nonzero: self.values.iter().filter(|v| **v > 0.0).count(),
        }
    }
}

fn check_radius(radius: f64) -> Result<(), AccessibilityError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(AccessibilityError::AggregationRadiusError(radius));
    }
    Ok(())
}

/// For every node `s`, sums `attribute(t) * decay(c(s, t))` over the nodes `t`
/// whose shortest-path cost from `s` is at most `radius`. Sources are
/// independent and run in parallel over the shared, read-only graph.
pub fn aggregate(
    network: &MergedNetwork,
    attribute: &NodeAttribute,
    radius: f64,
    decay: Decay,
) -> Result<Accessibility, AccessibilityError> {
    check_radius(radius)?;
    let graph = network.graph();
    let values = attribute.values();
    if values.len() != graph.node_count() {
        return Err(AccessibilityError::AttributeSizeError(
            values.len(),
            graph.node_count(),
        ));
    }

    let result = (0..graph.node_count())
        .into_par_iter()
        .map(|source| aggregate_from(graph, NodeID(source), values, radius, decay))
        .collect();

    Ok(Accessibility {
        radius,
        decay,
        values: result,
    })
}

/// Bounded Dijkstra from `source`; each node is settled at most once.
fn aggregate_from(graph: &Graph, source: NodeID, values: &[f64], radius: f64, decay: Decay) -> f64 {
    let mut pq = PriorityQueue::<NodeID, Reverse<Cost>>::new();
    let mut visited = HashSet::<NodeID>::new();
    let mut total = 0.0;

    pq.push(source, Reverse(Cost(0.0)));
    while let Some((id, Reverse(Cost(cost)))) = pq.pop() {
        visited.insert(id);
        total += values[id.0] * decay.weight(cost, radius);

        for edge in graph.edges_from(id) {
            let next = edge.destination();
            if visited.contains(&next) {
                continue;
            }
            let next_cost = cost + edge.weight();
            if next_cost > radius {
                continue;
            }
            pq.push_increase(next, Reverse(Cost(next_cost)));
        }
    }

    total
}

/// Runs [`aggregate`] for every radius, in ascending radius order.
pub fn sweep(
    network: &MergedNetwork,
    attribute: &NodeAttribute,
    radii: &[f64],
    decay: Decay,
) -> Result<Vec<Accessibility>, AccessibilityError> {
    for &r in radii {
        check_radius(r)?;
    }
    let mut radii = radii.to_vec();
    radii.sort_by(f64::total_cmp);
    radii.dedup();

    radii
        .into_iter()
        .map(|r| {
            let result = aggregate(network, attribute, r, decay)?;
            tracing::info!("{}", result.summary());
            Ok(result)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicityViolation {
    pub node: NodeID,
    pub smaller_radius: f64,
    pub larger_radius: f64,
    pub smaller_value: f64,
    pub larger_value: f64,
}

/// Nodes whose value drops when the radius grows, over consecutive results.
pub fn monotonicity_violations(results: &[Accessibility]) -> Vec<MonotonicityViolation> {
    let mut ordered: Vec<&Accessibility> = results.iter().collect();
    ordered.sort_by(|a, b| a.radius.total_cmp(&b.radius));

    let mut violations = Vec::new();
    for pair in ordered.windows(2) {
        let (small, large) = (pair[0], pair[1]);
        for (i, (s, l)) in small.values.iter().zip(&large.values).enumerate() {
            if l < s {
                violations.push(MonotonicityViolation {
                    node: NodeID(i),
                    smaller_radius: small.radius,
                    larger_radius: large.radius,
                    smaller_value: *s,
                    larger_value: *l,
                });
            }
        }
    }
    violations
}
