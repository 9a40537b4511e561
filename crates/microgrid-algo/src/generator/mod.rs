//! Diesel generator fuel curve and dispatch lifecycle.

pub mod diesel;
pub mod fuel_curve;

pub use diesel::{DieselGenerator, HourResult};
pub use fuel_curve::FuelCurve;
