//! The three network states. A [`TransitNetwork`] and a [`PedestrianNetwork`]
//! are built independently and consumed by [`integrate`] into a
//! [`MergedNetwork`], the only state accessibility can be computed on.

mod integrate;
mod pedestrian;
mod transit;

pub use integrate::{IsolatedNodeWarning, MergedNetwork, integrate};
pub use pedestrian::{PedestrianNetwork, walk_minutes};
pub use transit::{TransitNetwork, TransitReport, create_transit_network};
