//! Electric-bus traction battery aging simulator.

pub mod aging;
pub mod battery;
pub mod conditions;
pub mod config;
pub mod io;
pub mod runner;
/// Simulation engine, power strategies, and run summaries.
pub mod sim;
pub mod validation;
