use std::{
    fs,
    path::{Path, PathBuf},
};

use postcard::{from_bytes, to_allocvec};

use crate::schedule::ScheduleTables;

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("failed to access archive {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode or decode archive {path}: {source}")]
    CodecError {
        path: PathBuf,
        source: postcard::Error,
    },
}

pub fn archive_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(filename)
}

pub fn save_tables(
    tables: &ScheduleTables,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, PersistenceError> {
    let path = archive_path(dir, filename);
    let bytes = to_allocvec(tables).map_err(|source| PersistenceError::CodecError {
        path: path.clone(),
        source,
    })?;
    fs::create_dir_all(dir).map_err(|source| PersistenceError::IoError {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, &bytes).map_err(|source| PersistenceError::IoError {
        path: path.clone(),
        source,
    })?;
    tracing::info!("schedule tables saved to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

pub fn load_tables(dir: &Path, filename: &str) -> Result<ScheduleTables, PersistenceError> {
    let path = archive_path(dir, filename);
    let bytes = fs::read(&path).map_err(|source| PersistenceError::IoError {
        path: path.clone(),
        source,
    })?;
    let tables = from_bytes(&bytes).map_err(|source| PersistenceError::CodecError {
        path: path.clone(),
        source,
    })?;
    tracing::info!("schedule tables restored from {}", path.display());
    Ok(tables)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        schedule::{StopRecord, StopTimeRecord},
        structures::LatLng,
    };

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("transit-access-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_round_trip_is_identical() {
        let st = StopTimeRecord {
            feed: "madison".to_string(),
            trip_id: "t1".to_string(),
            stop_id: "s1".to_string(),
            stop_sequence: 3,
            arrival_time: Some(8 * 3600 + 300),
            departure_time: Some(8 * 3600 + 300),
            is_interpolated: true,
            time_from_previous: Some(300),
        };
        let tables = ScheduleTables {
            stops: vec![StopRecord {
                feed: "madison".to_string(),
                stop_id: "s1".to_string(),
                name: Some("Capitol Square".to_string()),
                lat_lng: LatLng {
                    latitude: 43.0747,
                    longitude: -89.3841,
                },
            }],
            stop_times: vec![StopTimeRecord {
                arrival_time: None,
                departure_time: None,
                is_interpolated: false,
                time_from_previous: None,
                ..st.clone()
            }],
            stop_times_int: vec![st],
            ..Default::default()
        };

        let dir = temp_dir("persistence");
        let path = save_tables(&tables, &dir, "network.bin").unwrap();
        assert!(path.exists());
        let restored = load_tables(&dir, "network.bin").unwrap();
        assert_eq!(restored, tables);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_archive_is_an_io_error() {
        let dir = temp_dir("missing");
        match load_tables(&dir, "nothing.bin") {
            Err(PersistenceError::IoError { .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_archive_is_a_codec_error() {
        let dir = temp_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.bin"), [0xff, 0xff, 0xff]).unwrap();
        match load_tables(&dir, "bad.bin") {
            Err(PersistenceError::CodecError { .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }
}
