//! Scenario configuration: the external interface a caller assembles before
//! handing it to the dispatch core or network solver.
//!
//! Per [§6.1 EXTERNAL INTERFACES], a scenario is a tagged union of component
//! configurations plus the weather and load inputs those components consume.
//! Nothing in this module does numeric simulation; it only describes intent
//! and validates it before the algorithm crate touches it.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::timeseries::HourlySeries;

/// One dispatchable or non-dispatchable component in a scenario, tagged by
/// kind so a scenario file can describe a heterogeneous fleet in one list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentConfig {
    SolarPv(SolarPvConfig),
    WindTurbine(WindTurbineConfig),
    Battery(BatteryConfig),
    DieselGenerator(DieselGeneratorConfig),
    GridConnection(GridConnectionConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarPvConfig {
    pub name: String,
    pub rated_kw: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    pub derate_factor: f64,
    pub temp_coeff_pct_per_c: f64,
    pub noct_c: f64,
    pub capital_cost_per_kw: f64,
    pub om_cost_per_kw_year: f64,
    pub lifetime_years: f64,
}

impl Default for SolarPvConfig {
    fn default() -> Self {
        Self {
            name: "pv".into(),
            rated_kw: 100.0,
            tilt_deg: 15.0,
            azimuth_deg: 0.0,
            derate_factor: 0.9,
            temp_coeff_pct_per_c: -0.4,
            noct_c: 45.0,
            capital_cost_per_kw: 900.0,
            om_cost_per_kw_year: 12.0,
            lifetime_years: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindTurbineConfig {
    pub name: String,
    pub rated_kw: f64,
    pub hub_height_m: f64,
    pub cut_in_ms: f64,
    pub rated_ms: f64,
    pub cut_out_ms: f64,
    /// Power-curve samples as `(wind_speed_ms, output_kw)`, ascending by speed.
    pub power_curve: Vec<(f64, f64)>,
    pub quantity: u32,
    pub capital_cost_per_kw: f64,
    pub om_cost_per_kw_year: f64,
    pub lifetime_years: f64,
}

impl Default for WindTurbineConfig {
    fn default() -> Self {
        Self {
            name: "wind".into(),
            rated_kw: 50.0,
            hub_height_m: 30.0,
            cut_in_ms: 3.0,
            rated_ms: 12.0,
            cut_out_ms: 25.0,
            power_curve: Vec::new(),
            quantity: 1,
            capital_cost_per_kw: 1_500.0,
            om_cost_per_kw_year: 30.0,
            lifetime_years: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub name: String,
    pub nominal_capacity_kwh: f64,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
    pub one_way_efficiency: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub initial_soc: f64,
    /// KiBaM kinetic rate constant `k` (1/hr).
    pub kibam_k: f64,
    /// KiBaM available-capacity fraction `c`.
    pub kibam_c: f64,
    /// Cell chemistry, used to pick the calendar-fade base rate: `"lfp"`,
    /// `"nmc"`, or `"lead_acid"`.
    pub chemistry: String,
    pub cycle_life: f64,
    pub capital_cost_per_kwh: f64,
    pub om_cost_per_kwh_year: f64,
    pub replacement_cost_per_kwh: f64,
    pub lifetime_years: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: "battery".into(),
            nominal_capacity_kwh: 100.0,
            max_charge_kw: 50.0,
            max_discharge_kw: 50.0,
            one_way_efficiency: 0.95,
            min_soc: 0.2,
            max_soc: 1.0,
            initial_soc: 0.5,
            kibam_k: 0.5,
            kibam_c: 0.8,
            chemistry: "nmc".into(),
            cycle_life: 5_000.0,
            capital_cost_per_kwh: 400.0,
            om_cost_per_kwh_year: 5.0,
            replacement_cost_per_kwh: 350.0,
            lifetime_years: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DieselGeneratorConfig {
    pub name: String,
    pub rated_kw: f64,
    pub min_load_ratio: f64,
    pub fuel_price_per_l: f64,
    pub fuel_curve_a0: f64,
    pub fuel_curve_a1: f64,
    pub om_cost_per_hour: f64,
    pub start_cost: f64,
    pub capital_cost_per_kw: f64,
    pub lifetime_hours: f64,
}

impl Default for DieselGeneratorConfig {
    fn default() -> Self {
        Self {
            name: "diesel".into(),
            rated_kw: 100.0,
            min_load_ratio: 0.3,
            fuel_price_per_l: 1.2,
            fuel_curve_a0: 0.0845,
            fuel_curve_a1: 0.2460,
            om_cost_per_hour: 2.0,
            start_cost: 5.0,
            capital_cost_per_kw: 400.0,
            lifetime_hours: 15_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConnectionConfig {
    pub name: String,
    pub max_import_kw: f64,
    pub max_export_kw: f64,
    pub sell_back_enabled: bool,
    pub net_metering: bool,
    pub grid_co2_intensity_kg_per_kwh: f64,
}

impl Default for GridConnectionConfig {
    fn default() -> Self {
        Self {
            name: "grid".into(),
            max_import_kw: 1_000.0,
            max_export_kw: 500.0,
            sell_back_enabled: true,
            net_metering: false,
            grid_co2_intensity_kg_per_kwh: 0.7,
        }
    }
}

/// Project-wide financial assumptions, independent of any one component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub discount_rate: f64,
    pub project_lifetime_years: u32,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            discount_rate: 0.08,
            project_lifetime_years: 25,
        }
    }
}

/// Weather inputs a solar or wind model needs, one series per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub ghi_w_m2: HourlySeries,
    pub dni_w_m2: HourlySeries,
    pub ambient_temp_c: HourlySeries,
    pub wind_speed_ms: HourlySeries,
}

/// The electrical load a scenario must serve, at the same cadence as
/// weather and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadProfile {
    pub name: String,
    pub demand_kw: HourlySeries,
}

impl ComponentConfig {
    pub fn name(&self) -> &str {
        match self {
            ComponentConfig::SolarPv(c) => &c.name,
            ComponentConfig::WindTurbine(c) => &c.name,
            ComponentConfig::Battery(c) => &c.name,
            ComponentConfig::DieselGenerator(c) => &c.name,
            ComponentConfig::GridConnection(c) => &c.name,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        match self {
            ComponentConfig::SolarPv(c) => {
                if c.rated_kw <= 0.0 {
                    return Err(CoreError::config("rated_kw", "must be positive"));
                }
                if !(0.0..=90.0).contains(&c.tilt_deg) {
                    return Err(CoreError::config("tilt_deg", "must be in [0, 90]"));
                }
            }
            ComponentConfig::WindTurbine(c) => {
                if c.rated_kw <= 0.0 {
                    return Err(CoreError::config("rated_kw", "must be positive"));
                }
                if c.cut_in_ms >= c.rated_ms || c.rated_ms >= c.cut_out_ms {
                    return Err(CoreError::config(
                        "power_curve",
                        "requires cut_in < rated < cut_out wind speeds",
                    ));
                }
            }
            ComponentConfig::Battery(c) => {
                if c.min_soc >= c.max_soc {
                    return Err(CoreError::config("min_soc", "must be less than max_soc"));
                }
                if !(c.min_soc..=c.max_soc).contains(&c.initial_soc) {
                    return Err(CoreError::config(
                        "initial_soc",
                        "must lie within [min_soc, max_soc]",
                    ));
                }
                if !(0.0..=1.0).contains(&c.one_way_efficiency) {
                    return Err(CoreError::config(
                        "one_way_efficiency",
                        "must be in [0, 1]",
                    ));
                }
            }
            ComponentConfig::DieselGenerator(c) => {
                if c.rated_kw <= 0.0 {
                    return Err(CoreError::config("rated_kw", "must be positive"));
                }
                if !(0.0..=1.0).contains(&c.min_load_ratio) {
                    return Err(CoreError::config("min_load_ratio", "must be in [0, 1]"));
                }
            }
            ComponentConfig::GridConnection(c) => {
                if c.max_import_kw < 0.0 || c.max_export_kw < 0.0 {
                    return Err(CoreError::config(
                        "max_import_kw/max_export_kw",
                        "must be non-negative",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_default_validates() {
        let cfg = ComponentConfig::Battery(BatteryConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn battery_rejects_inverted_soc_bounds() {
        let mut batt = BatteryConfig::default();
        batt.min_soc = 0.8;
        batt.max_soc = 0.3;
        assert!(ComponentConfig::Battery(batt).validate().is_err());
    }

    #[test]
    fn wind_rejects_unordered_speeds() {
        let cfg = WindTurbineConfig {
            cut_in_ms: 12.0,
            rated_ms: 10.0,
            ..WindTurbineConfig::default()
        };
        assert!(ComponentConfig::WindTurbine(cfg).validate().is_err());
    }
}
