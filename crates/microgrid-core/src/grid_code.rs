//! Grid-code profiles consumed by the network solver and contingency screener.
//!
//! Per [§4.4.5], only the voltage and thermal-limit fields are consumed by
//! the core; the rest travel through as pass-through data for downstream
//! reporting. They're still modeled in full here (rather than dropped) since
//! a caller assembling a [`GridCodeProfile`] from a standard's published
//! limits expects to get the whole profile back out unchanged.
//!
//! Grounded on the original `grid_codes.py` dataclasses and their published
//! defaults.

use serde::{Deserialize, Serialize};

use crate::units::PerUnit;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoltageLimits {
    pub normal_min_pu: PerUnit,
    pub normal_max_pu: PerUnit,
    pub contingency_min_pu: PerUnit,
    pub contingency_max_pu: PerUnit,
}

impl VoltageLimits {
    pub fn check_normal(&self, v_pu: PerUnit) -> bool {
        v_pu.value() >= self.normal_min_pu.value() && v_pu.value() <= self.normal_max_pu.value()
    }

    pub fn check_contingency(&self, v_pu: PerUnit) -> bool {
        v_pu.value() >= self.contingency_min_pu.value()
            && v_pu.value() <= self.contingency_max_pu.value()
    }
}

impl Default for VoltageLimits {
    fn default() -> Self {
        Self {
            normal_min_pu: PerUnit(0.95),
            normal_max_pu: PerUnit(1.05),
            contingency_min_pu: PerUnit(0.90),
            contingency_max_pu: PerUnit(1.10),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyLimits {
    pub nominal_hz: f64,
    pub normal_min_hz: f64,
    pub normal_max_hz: f64,
}

impl Default for FrequencyLimits {
    fn default() -> Self {
        Self {
            nominal_hz: 50.0,
            normal_min_hz: 49.5,
            normal_max_hz: 50.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaultLevelLimits {
    pub min_fault_mva: f64,
    pub max_fault_mva: f64,
}

impl Default for FaultLevelLimits {
    fn default() -> Self {
        Self {
            min_fault_mva: 1.0,
            max_fault_mva: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerFactorLimits {
    pub min_lagging: f64,
    pub min_leading: f64,
}

impl Default for PowerFactorLimits {
    fn default() -> Self {
        Self {
            min_lagging: 0.95,
            min_leading: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectionRequirements {
    pub min_dead_time_s: f64,
    pub max_voltage_deviation_pu: f64,
    pub max_frequency_deviation_hz: f64,
}

impl Default for ReconnectionRequirements {
    fn default() -> Self {
        Self {
            min_dead_time_s: 60.0,
            max_voltage_deviation_pu: 0.05,
            max_frequency_deviation_hz: 0.2,
        }
    }
}

/// A named grid-interconnection standard: voltage and thermal limits are
/// consumed by the power-flow and contingency modules; the rest is carried
/// for downstream reporting only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCodeProfile {
    pub name: String,
    pub standard: String,
    pub voltage: VoltageLimits,
    pub frequency: FrequencyLimits,
    pub fault_level: FaultLevelLimits,
    pub power_factor: PowerFactorLimits,
    pub reconnection: ReconnectionRequirements,
    pub thermal_limit_pct: f64,
    pub max_voltage_unbalance_pct: f64,
    pub max_thd_pct: f64,
}

impl GridCodeProfile {
    /// IEC 60909-aligned default profile, matching the original platform's
    /// `IEC_DEFAULT` constant.
    pub fn iec_default() -> Self {
        Self {
            name: "IEC Default".into(),
            standard: "IEC 60909".into(),
            voltage: VoltageLimits::default(),
            frequency: FrequencyLimits::default(),
            fault_level: FaultLevelLimits::default(),
            power_factor: PowerFactorLimits::default(),
            reconnection: ReconnectionRequirements::default(),
            thermal_limit_pct: 100.0,
            max_voltage_unbalance_pct: 2.0,
            max_thd_pct: 5.0,
        }
    }

    /// IEEE 1547-aligned profile, slightly wider contingency voltage band.
    pub fn ieee1547() -> Self {
        Self {
            name: "IEEE 1547".into(),
            standard: "IEEE 1547-2018".into(),
            voltage: VoltageLimits {
                normal_min_pu: PerUnit(0.917),
                normal_max_pu: PerUnit(1.05),
                contingency_min_pu: PerUnit(0.88),
                contingency_max_pu: PerUnit(1.10),
            },
            frequency: FrequencyLimits {
                nominal_hz: 60.0,
                normal_min_hz: 59.3,
                normal_max_hz: 60.5,
            },
            fault_level: FaultLevelLimits::default(),
            power_factor: PowerFactorLimits::default(),
            reconnection: ReconnectionRequirements::default(),
            thermal_limit_pct: 100.0,
            max_voltage_unbalance_pct: 3.0,
            max_thd_pct: 5.0,
        }
    }
}

impl Default for GridCodeProfile {
    fn default() -> Self {
        Self::iec_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_band_is_tighter_than_contingency_band() {
        let v = VoltageLimits::default();
        assert!(v.normal_min_pu.value() > v.contingency_min_pu.value());
        assert!(v.normal_max_pu.value() < v.contingency_max_pu.value());
    }

    #[test]
    fn iec_default_passes_at_nominal_voltage() {
        let profile = GridCodeProfile::iec_default();
        assert!(profile.voltage.check_normal(PerUnit(1.0)));
        assert!(profile.voltage.check_contingency(PerUnit(1.0)));
    }

    #[test]
    fn contingency_band_accepts_wider_excursion_than_normal() {
        let profile = GridCodeProfile::iec_default();
        assert!(!profile.voltage.check_normal(PerUnit(0.91)));
        assert!(profile.voltage.check_contingency(PerUnit(0.91)));
    }
}
