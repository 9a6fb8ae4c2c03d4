mod gtfs;

pub use gtfs::*;
