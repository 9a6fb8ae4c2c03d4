pub mod cache;
mod error;
pub mod gtfs;
pub mod osm;
pub mod points;

pub use error::IngestionError;
