#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("No feed named '{0}' in the feed registry")]
    FeedResolutionError(String),
    #[error("Failed to download {url} after {attempts} attempt(s): {message}")]
    DownloadError {
        url: String,
        attempts: u32,
        message: String,
    },
    #[error("{0}")]
    UnknownSchemeError(String),
    #[error("Failed to read GTFS: {0}")]
    GtfsError(#[from] gtfs_structures::Error),
    #[error("Failed to read OSM PBF: {0}")]
    OsmError(#[from] osmpbf::Error),
    #[error("Failed to read points: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Column '{0}' not found in point dataset")]
    MissingColumnError(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
