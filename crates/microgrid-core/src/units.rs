//! Compile-time unit safety for microgrid quantities.
//!
//! Prevents mixing incompatible units like kW and kWh, or per-unit impedance
//! with per-unit voltage, at the type level instead of by convention.
//!
//! # Design Philosophy
//!
//! Per [§9 DESIGN NOTES], power is kW everywhere at the dispatch level; the
//! per-unit system is confined to the network subsystem. The two halves never
//! mix, so the wrapper types are split the same way: [`Kilowatts`] /
//! [`KilowattHours`] for dispatch, [`PerUnit`] / [`Kilovolts`] / [`Radians`] /
//! [`ImpedancePu`] / [`AdmittancePu`] for the network solver.
//!
//! # Zero runtime overhead
//!
//! All types use `#[repr(transparent)]`, so they share `f64`'s memory layout
//! and the wrapper disappears after optimization.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value.
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value.
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            #[inline]
            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }

            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            #[inline]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                Self(self.0.clamp(min.0, max.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Dispatch-level units (kW domain)
// =============================================================================

/// Instantaneous power in kilowatts, used throughout the dispatch core.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilowatts(pub f64);

impl_unit_ops!(Kilowatts, "kW");

/// Energy in kilowatt-hours, used for battery capacity and throughput.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KilowattHours(pub f64);

impl_unit_ops!(KilowattHours, "kWh");

impl Kilowatts {
    /// Energy delivered at this constant power over `hours`.
    #[inline]
    pub fn over(self, hours: f64) -> KilowattHours {
        KilowattHours(self.0 * hours)
    }
}

impl KilowattHours {
    /// Average power to deliver this energy over `hours`.
    #[inline]
    pub fn rate_over(self, hours: f64) -> Kilowatts {
        if hours.abs() < 1e-12 {
            Kilowatts(0.0)
        } else {
            Kilowatts(self.0 / hours)
        }
    }
}

// =============================================================================
// Network-level units (per-unit domain)
// =============================================================================

/// Apparent power in megavolt-amperes (MVA), used for branch thermal ratings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MegavoltAmperes(pub f64);

impl_unit_ops!(MegavoltAmperes, "MVA");

/// Voltage magnitude in per-unit (pu), normalized to a bus's base voltage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

/// Voltage in kilovolts (kV).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

impl PerUnit {
    #[inline]
    pub fn to_kilovolts(self, base_kv: Kilovolts) -> Kilovolts {
        Kilovolts(self.0 * base_kv.0)
    }

    pub const ONE: Self = Self(1.0);
    pub const ZERO: Self = Self(0.0);
}

impl Kilovolts {
    #[inline]
    pub fn to_per_unit(self, base_kv: Kilovolts) -> PerUnit {
        if base_kv.0.abs() < 1e-12 {
            PerUnit(0.0)
        } else {
            PerUnit(self.0 / base_kv.0)
        }
    }
}

/// Angle in radians, the natural unit for Y-bus and power-flow trigonometry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Radians(pub f64);

impl_unit_ops!(Radians, "rad");

/// Angle in degrees, used at configuration boundaries (tilt, azimuth, phase).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Degrees(pub f64);

impl_unit_ops!(Degrees, "°");

impl Radians {
    #[inline]
    pub fn to_degrees(self) -> Degrees {
        Degrees(self.0 * 180.0 / std::f64::consts::PI)
    }

    #[inline]
    pub fn sin(self) -> f64 {
        self.0.sin()
    }

    #[inline]
    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    pub const ZERO: Self = Self(0.0);
    pub const PI: Self = Self(std::f64::consts::PI);
    pub const FRAC_PI_2: Self = Self(std::f64::consts::FRAC_PI_2);
}

impl Degrees {
    #[inline]
    pub fn to_radians(self) -> Radians {
        Radians(self.0 * std::f64::consts::PI / 180.0)
    }

    pub const ZERO: Self = Self(0.0);
}

/// Impedance in per-unit, normalized to `Z_base = V_base^2 / S_base`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ImpedancePu(pub f64);

impl_unit_ops!(ImpedancePu, "pu");

/// Admittance in per-unit (`Y = 1/Z`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AdmittancePu(pub f64);

impl_unit_ops!(AdmittancePu, "pu");

impl ImpedancePu {
    #[inline]
    pub fn to_admittance(self) -> AdmittancePu {
        if self.0.abs() < 1e-12 {
            AdmittancePu(f64::INFINITY)
        } else {
            AdmittancePu(1.0 / self.0)
        }
    }
}

impl AdmittancePu {
    #[inline]
    pub fn to_impedance(self) -> ImpedancePu {
        if self.0.abs() < 1e-12 {
            ImpedancePu(f64::INFINITY)
        } else {
            ImpedancePu(1.0 / self.0)
        }
    }
}

/// Current in kiloamperes, used for short-circuit results.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kiloamperes(pub f64);

impl_unit_ops!(Kiloamperes, "kA");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilowatts_arithmetic() {
        let p1 = Kilowatts(100.0);
        let p2 = Kilowatts(50.0);
        assert_eq!((p1 + p2).value(), 150.0);
        assert_eq!((p1 - p2).value(), 50.0);
        assert_eq!((-p1).value(), -100.0);
        assert_eq!((p1 * 2.0).value(), 200.0);
        assert_eq!((2.0 * p1).value(), 200.0);
        assert_eq!(p1 / p2, 2.0);
    }

    #[test]
    fn kilowatt_hours_conversion() {
        let p = Kilowatts(10.0);
        let e = p.over(3.0);
        assert_eq!(e.value(), 30.0);
        assert_eq!(e.rate_over(3.0).value(), 10.0);
    }

    #[test]
    fn per_unit_kilovolt_roundtrip() {
        let base = Kilovolts(11.0);
        let v = PerUnit(1.02);
        let kv = v.to_kilovolts(base);
        assert!((kv.value() - 11.22).abs() < 1e-10);
        assert!((kv.to_per_unit(base).value() - 1.02).abs() < 1e-10);
    }

    #[test]
    fn angle_conversion() {
        let deg = Degrees(180.0);
        assert!((deg.to_radians().value() - std::f64::consts::PI).abs() < 1e-10);
    }

    #[test]
    fn impedance_admittance_roundtrip() {
        let z = ImpedancePu(0.08);
        let y = z.to_admittance();
        assert!((y.value() - 12.5).abs() < 1e-8);
        assert!((y.to_impedance().value() - 0.08).abs() < 1e-10);
    }

    #[test]
    fn sum_iterator() {
        let loads = vec![Kilowatts(10.0), Kilowatts(20.0), Kilowatts(30.0)];
        let total: Kilowatts = loads.into_iter().sum();
        assert_eq!(total.value(), 60.0);
    }
}
