pub mod build;
mod gate;
pub mod persistence;

pub use gate::{BatchGate, StageGate};
