//! Battery configuration and state snapshots.

/// Static bus and pack configuration.
pub mod bus;
pub mod state;

pub use bus::Bus;
pub use state::BatteryState;
