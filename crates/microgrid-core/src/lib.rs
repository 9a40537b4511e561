//! Shared data model for the hybrid-microgrid simulation engine.
//!
//! This crate owns the types every subsystem agrees on: unit-safe scalar
//! wrappers, the unified error type, the 8,760-hour time series contract,
//! scenario configuration, grid-code profiles, and the flat network
//! topology consumed by the power-flow solver. The simulation algorithms
//! themselves (dispatch strategies, component physics, economics, power
//! flow) live in `microgrid-algo`, which depends on this crate.

pub mod config;
pub mod error;
pub mod grid_code;
pub mod network;
pub mod timeseries;
pub mod units;

pub use config::{
    BatteryConfig, ComponentConfig, DieselGeneratorConfig, GridConnectionConfig, LoadProfile,
    ProjectConfig, SolarPvConfig, WeatherBundle, WindTurbineConfig,
};
pub use error::{CoreError, CoreResult};
pub use grid_code::GridCodeProfile;
pub use network::{Branch, BranchType, Bus, BusType, NetworkModel};
pub use timeseries::{HourlySeries, HOURS_PER_YEAR};
