use std::{fs::File, io::Read};

use geo::{Centroid, Geometry};
use wkt::TryFromWkt;

use crate::{ingestion::IngestionError, structures::LatLng};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GeometryParseError {
    #[error("malformed WKT '{wkt}': {message}")]
    MalformedError { wkt: String, message: String },
    #[error("geometry has no centroid")]
    EmptyGeometryError,
}

/// Parses WKT, or EWKT with its `SRID=...;` prefix dropped.
pub fn parse_wkt(s: &str) -> Result<Geometry<f64>, GeometryParseError> {
    let s = s.trim();
    let body = if s.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("SRID")) {
        match s.split_once(';') {
            Some((_, body)) => body,
            None => {
                return Err(GeometryParseError::MalformedError {
                    wkt: s.to_string(),
                    message: "SRID prefix without ';'".to_string(),
                });
            }
        }
    } else {
        s
    };

    Geometry::try_from_wkt_str(body).map_err(|e| GeometryParseError::MalformedError {
        wkt: s.to_string(),
        message: e.to_string(),
    })
}

/// A located value to attach to the nearest graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePoint {
    pub lat_lng: LatLng,
    pub value: f64,
}

#[derive(Debug, Default)]
pub struct PointLoad {
    pub points: Vec<AttributePoint>,
    pub rows: usize,
    pub skipped_geometry: usize,
    pub skipped_value: usize,
}

pub fn load_points(
    path: &str,
    geometry_column: &str,
    attribute: &str,
) -> Result<PointLoad, IngestionError> {
    let file = File::open(path)?;
    read_points(file, geometry_column, attribute)
}

/// Reads a CSV with a WKT/EWKT geometry column, keeping each geometry's
/// centroid with the numeric `attribute`. Rows with an unreadable geometry or
/// a missing, negative, or non-numeric value are skipped and counted.
pub fn read_points<R: Read>(
    reader: R,
    geometry_column: &str,
    attribute: &str,
) -> Result<PointLoad, IngestionError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IngestionError::MissingColumnError(name.to_string()))
    };
    let geometry_idx = column(geometry_column)?;
    let attribute_idx = column(attribute)?;

    let mut load = PointLoad::default();
    for record in rdr.records() {
        let record = record?;
        load.rows += 1;

        let centroid = parse_wkt(record.get(geometry_idx).unwrap_or_default())
            .and_then(|g| g.centroid().ok_or(GeometryParseError::EmptyGeometryError));
        let point = match centroid {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("row {}: {e}", load.rows);
                load.skipped_geometry += 1;
                continue;
            }
        };

        let value = record
            .get(attribute_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0);
        let Some(value) = value else {
            load.skipped_value += 1;
            continue;
        };

        load.points.push(AttributePoint {
            lat_lng: LatLng {
                latitude: point.y(),
                longitude: point.x(),
            },
            value,
        });
    }

    tracing::info!(
        "{} of {} points loaded ({} bad geometries, {} bad '{attribute}' values skipped)",
        load.points.len(),
        load.rows,
        load.skipped_geometry,
        load.skipped_value
    );

    Ok(load)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_wkt_and_ewkt() {
        let plain = parse_wkt("POINT(-89.4 43.07)").unwrap();
        let ewkt = parse_wkt("SRID=4326;POINT(-89.4 43.07)").unwrap();
        assert_eq!(plain, ewkt);
        assert!(parse_wkt("POINT(-89.4").is_err());
        assert!(parse_wkt("SRID=4326 POINT(1 2)").is_err());
    }

    #[test]
    fn test_read_points_uses_centroids_and_counts_skips() {
        let csv = "\
block_id,emp,geometry
1,10,\"POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))\"
2,5,SRID=4326;POINT(-89.4 43.07)
3,7,NOT WKT
4,,POINT(1 1)
5,-3,POINT(1 1)
";
        let load = read_points(csv.as_bytes(), "geometry", "emp").unwrap();
        assert_eq!(load.rows, 5);
        assert_eq!(load.points.len(), 2);
        assert_eq!(load.skipped_geometry, 1);
        assert_eq!(load.skipped_value, 2);
        assert_eq!(
            load.points[0],
            AttributePoint {
                lat_lng: LatLng {
                    latitude: 1.0,
                    longitude: 1.0
                },
                value: 10.0
            }
        );
        assert_eq!(load.points[1].lat_lng.latitude, 43.07);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let csv = "id,geometry\n1,POINT(0 0)\n";
        match read_points(csv.as_bytes(), "geometry", "emp") {
            Err(IngestionError::MissingColumnError(c)) => assert_eq!(c, "emp"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
