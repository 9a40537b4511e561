//! Linear fuel-consumption curve for a reciprocating generator.
//!
//! `F(P) = a0 * P_rated + a1 * P_output` L/hr (HOMER Energy methodology;
//! Barley & Winn, 1996). `a0` is the no-load intercept, `a1` the marginal
//! slope per kW of electrical output.

use microgrid_core::error::{CoreError, CoreResult};

const DIESEL_ENERGY_CONTENT_KWH_PER_L: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct FuelCurve {
    pub a0: f64,
    pub a1: f64,
}

impl Default for FuelCurve {
    fn default() -> Self {
        Self { a0: 0.0845, a1: 0.2460 }
    }
}

impl FuelCurve {
    pub fn new(a0: f64, a1: f64) -> CoreResult<Self> {
        if a0 < 0.0 {
            return Err(CoreError::config("a0", "must be >= 0"));
        }
        if a1 <= 0.0 {
            return Err(CoreError::config("a1", "must be > 0"));
        }
        Ok(Self { a0, a1 })
    }

    /// Fuel consumption in L/hr, clamping small floating-point overshoot
    /// of `power_output_kw` above `rated_power_kw`.
    pub fn consumption(&self, power_output_kw: f64, rated_power_kw: f64) -> f64 {
        let power_output_kw = power_output_kw.max(0.0).min(rated_power_kw);
        self.a0 * rated_power_kw + self.a1 * power_output_kw
    }

    /// Electrical conversion efficiency in kWh_e produced per litre consumed.
    pub fn efficiency(&self, power_output_kw: f64, rated_power_kw: f64) -> f64 {
        if power_output_kw <= 0.0 {
            return 0.0;
        }
        let fuel_l_per_hr = self.consumption(power_output_kw, rated_power_kw);
        power_output_kw / fuel_l_per_hr
    }

    /// Fraction of fuel thermal energy converted to electricity, in `[0, 1]`.
    pub fn thermal_efficiency(&self, power_output_kw: f64, rated_power_kw: f64) -> f64 {
        self.efficiency(power_output_kw, rated_power_kw) / DIESEL_ENERGY_CONTENT_KWH_PER_L
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_slope() {
        assert!(FuelCurve::new(0.05, 0.0).is_err());
    }

    #[test]
    fn consumption_matches_homer_defaults_at_full_load() {
        let fc = FuelCurve::default();
        let l_per_hr = fc.consumption(100.0, 100.0);
        assert!((l_per_hr - (0.0845 * 100.0 + 0.2460 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn efficiency_is_zero_at_idle() {
        let fc = FuelCurve::default();
        assert_eq!(fc.efficiency(0.0, 100.0), 0.0);
        assert_eq!(fc.thermal_efficiency(0.0, 100.0), 0.0);
    }

    #[test]
    fn overshoot_is_clamped_to_rated() {
        let fc = FuelCurve::default();
        let at_rated = fc.consumption(100.0, 100.0);
        let overshot = fc.consumption(100.1, 100.0);
        assert_eq!(at_rated, overshot);
    }
}
