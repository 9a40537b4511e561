//! Grid interconnection, tariff pricing, and demand-charge billing.

pub mod connection;
pub mod tariff;

pub use connection::GridConnection;
pub use tariff::{DemandCharge, Tariff, TouPeriod};
