//! Simulation algorithms for the hybrid-microgrid engine: component
//! physics, dispatch strategies, economics, and the network solver.
//!
//! Depends on `microgrid-core` for the shared data model (units, config,
//! error type, time series, grid-code profiles, network topology) and
//! implements the numerics on top of it.

pub mod battery;
pub mod contingency;
pub mod dispatch;
pub mod economics;
pub mod generator;
pub mod grid;
pub mod power_flow;
pub mod sim;
pub mod solar;
pub mod wind;
