pub mod engine;
/// Post-hoc run summary.
pub mod kpi;
/// Fast-loop power strategies.
pub mod power_source;
pub mod types;
/// Trailing SoC window and depth-of-discharge extraction.
pub mod window;
