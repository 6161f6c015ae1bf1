//! Calendar and cyclic capacity-fade model.

pub mod model;
pub mod params;

pub use model::{AgingModel, CyclicLoss, graphite_expansion, stress_amplitude};
pub use params::{AgingParameters, AgingPreset, SocDependence};
