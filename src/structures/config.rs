use std::{collections::BTreeMap, fs};

use serde::Deserialize;

use crate::{
    ingestion::cache::SourceLocation,
    routing::Decay,
    schedule::{ScheduleScope, ServiceDay, TimeWindow},
    structures::BoundingBox,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub feeds: FeedRegistry,
    pub acquisition: AcquisitionConfig,
    pub schedule: ScheduleConfig,
    pub network: NetworkConfig,
    pub accessibility: AccessibilityConfig,
}

/// Explicit mapping from feed name to its resource (`http(s)://...` or `path:...`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FeedRegistry(pub BTreeMap<String, String>);

#[derive(Debug, Deserialize)]
pub struct AcquisitionConfig {
    pub feeds: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    pub bbox: BoundingBox,
    #[serde(default = "default_true")]
    pub remove_stops_outside_bbox: bool,
    pub day: ServiceDay,
    pub timerange: TimeWindow,
    pub archive: String,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    pub osm: String,
    #[serde(default = "default_walk_speed_mph")]
    pub walk_speed_mph: f64,
    #[serde(default = "default_snap_distance_m")]
    pub snap_distance_m: f64,
}

#[derive(Debug, Deserialize)]
pub struct AccessibilityConfig {
    pub points: String,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
    pub attribute: String,
    #[serde(default)]
    pub decay: Decay,
    #[serde(default = "default_radii")]
    pub radii: Vec<f64>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_true() -> bool {
    true
}

fn default_walk_speed_mph() -> f64 {
    3.0
}

fn default_snap_distance_m() -> f64 {
    1000.0
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}

fn default_radii() -> Vec<f64> {
    vec![15.0, 30.0, 45.0, 60.0]
}

impl FeedRegistry {
    /// Feeds whose name or resource contains `text`, case-insensitively.
    pub fn search(&self, text: &str) -> Vec<(&str, &str)> {
        let needle = text.to_lowercase();
        self.0
            .iter()
            .filter(|(name, url)| {
                name.to_lowercase().contains(&needle) || url.to_lowercase().contains(&needle)
            })
            .map(|(name, url)| (name.as_str(), url.as_str()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl ScheduleConfig {
    pub fn scope(&self) -> ScheduleScope {
        ScheduleScope {
            day: self.day,
            window: self.timerange,
            bbox: self.remove_stops_outside_bbox.then_some(self.bbox),
        }
    }
}

impl NetworkConfig {
    pub fn location(&self) -> Result<SourceLocation, String> {
        SourceLocation::parse("osm", &self.osm)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config: {e}"))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_yml::from_str(content).map_err(|e| format!("Failed to parse config: {e}"))
    }
}
