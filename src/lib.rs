pub mod ingestion;
pub mod network;
pub mod routing;
pub mod schedule;
pub mod services;
pub mod structures;
