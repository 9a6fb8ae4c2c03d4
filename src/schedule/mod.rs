mod calendar;
mod headways;
mod interpolate;
mod tables;

pub use calendar::{TripSelection, select_trips};
pub use headways::compute_headways;
pub use interpolate::{
    ExcludedTrip, InterpolationError, InterpolationReport, interpolate_stop_times, time_difference,
};
pub use tables::*;
