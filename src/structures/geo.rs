use std::fmt::Display;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

impl LatLng {
    /// Haversine distance in metres between two `[lat, lon]` slices, usable as
    /// a k-d tree distance function.
    pub fn distance(loc1: &[f64], loc2: &[f64]) -> f64 {
        assert!(loc1.len() == 2);
        assert!(loc2.len() == 2);
        haversine(loc1[0], loc1[1], loc2[0], loc2[1])
    }

    pub fn dist(&self, other: Self) -> f64 {
        haversine(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let delta_latitude = (lat1 - lat2).to_radians();
    let delta_longitude = (lon1 - lon2).to_radians();

    let central_angle_inner = (delta_latitude / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_longitude / 2.0).sin().powi(2);
    let central_angle = 2.0 * central_angle_inner.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

/// `(min_lon, min_lat, max_lon, max_lat)`, serialized as a four element list.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, loc: LatLng) -> bool {
        loc.longitude >= self.min_lon
            && loc.longitude <= self.max_lon
            && loc.latitude >= self.min_lat
            && loc.latitude <= self.max_lat
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox {
            min_lon: v[0],
            min_lat: v[1],
            max_lon: v[2],
            max_lat: v[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_one_degree_latitude_is_about_111km() {
        let a = LatLng {
            latitude: 43.0,
            longitude: -89.4,
        };
        let b = LatLng {
            latitude: 44.0,
            longitude: -89.4,
        };
        let d = a.dist(b);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
        assert_eq!(LatLng::distance(&[43.0, -89.4], &[44.0, -89.4]), d);
    }

    #[test]
    fn test_bbox_contains_edges_and_rejects_outside() {
        let bbox = BoundingBox::from([-89.566399, 42.984056, -89.229584, 43.171917]);
        let inside = LatLng {
            latitude: 43.07,
            longitude: -89.4,
        };
        let outside = LatLng {
            latitude: 43.5,
            longitude: -89.4,
        };
        assert!(bbox.contains(inside));
        assert!(!bbox.contains(outside));
        assert!(bbox.contains(LatLng {
            latitude: 42.984056,
            longitude: -89.566399
        }));
    }
}
