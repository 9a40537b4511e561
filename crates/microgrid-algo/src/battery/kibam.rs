//! Kinetic Battery Model (KiBaM) rate-dependent capacity limits.
//!
//! The KiBaM splits capacity into two wells: an available well (`q1`) that
//! directly supplies the load, and a bound well (`q2`) that feeds `q1`
//! through a rate-limited conductance. This captures the real-world effect
//! where high C-rates extract less usable energy than low C-rates.
//!
//! Reference: Manwell, J.F. & McGowan, J.G. (1993). Lead acid battery
//! storage model for hybrid energy systems. Solar Energy, 50(5), 399-405.

use microgrid_core::error::{CoreError, CoreResult};

/// Two-well kinetic battery capacity model.
#[derive(Debug, Clone, Copy)]
pub struct KiBaMModel {
    /// Total capacity in kWh, summed across both wells at full charge.
    pub q_max: f64,
    /// Fraction of total capacity in the available-charge well, in (0, 1).
    pub c: f64,
    /// Rate constant (1/h) governing charge flow between the wells.
    pub k: f64,
}

impl KiBaMModel {
    pub fn new(q_max: f64, c: f64, k: f64) -> CoreResult<Self> {
        if q_max <= 0.0 {
            return Err(CoreError::config("q_max", "must be positive"));
        }
        if !(0.0 < c && c < 1.0) {
            return Err(CoreError::config("c", "must be in (0, 1)"));
        }
        if k <= 0.0 {
            return Err(CoreError::config("k", "must be positive"));
        }
        Ok(Self { q_max, c, k })
    }

    /// Usable energy (kWh) at a constant `discharge_rate` (kW) sustained
    /// over `duration` hours, starting from a full battery. The closed-form
    /// solution of the two-well ODE system (Manwell & McGowan, Eq. 6).
    pub fn available_capacity(&self, discharge_rate: f64, duration: f64) -> f64 {
        let discharge_rate = discharge_rate.abs();
        if discharge_rate <= 0.0 || duration <= 0.0 {
            return 0.0;
        }

        let (c, k, q_max) = (self.c, self.k, self.q_max);
        let t = duration;
        let q1_0 = c * q_max;
        let q2_0 = (1.0 - c) * q_max;
        let exp_term = (-k * t).exp();

        let numerator = q_max * k * c * t + q1_0 * exp_term + q2_0 * (k * c * t - 1.0 + exp_term);
        let denominator = 1.0 - exp_term + k * c * t;
        if denominator == 0.0 {
            return 0.0;
        }

        let q_available = numerator / denominator;
        let requested = discharge_rate * t;
        q_available.min(requested).clamp(0.0, q_max)
    }

    /// Maximum instantaneous charge power (kW) given `soc` in `[0, 1]` and
    /// the nameplate `max_rate` (kW). Tapers linearly over the top 15% of
    /// SOC once the kinetic limit stops binding first.
    pub fn max_charge_power(&self, soc: f64, max_rate: f64) -> f64 {
        let max_rate = max_rate.abs();
        let soc = soc.clamp(0.0, 1.0);
        if soc >= 1.0 {
            return 0.0;
        }

        let (c, k, q_max) = (self.c, self.k, self.q_max);
        let q_total = soc * q_max;
        let q1 = c * q_total;
        let q2 = (1.0 - c) * q_total;

        let q1_max = c * q_max;
        let q1_room = q1_max - q1;

        let conductance_flow = if c < 1.0 {
            k * (q1 / c - q2 / (1.0 - c))
        } else {
            0.0
        };

        let kinetic_limit_kw = (q1_room * k / c + conductance_flow).max(0.0);

        const TAPER_START: f64 = 0.85;
        let soc_limit = if soc < TAPER_START {
            max_rate
        } else {
            max_rate * (1.0 - soc) / (1.0 - TAPER_START)
        };

        max_rate.min(kinetic_limit_kw).min(soc_limit)
    }

    /// Maximum instantaneous discharge power (kW) given `soc` in `[0, 1]`
    /// and the nameplate `max_rate` (kW). Tapers linearly over the bottom
    /// 15% of SOC.
    pub fn max_discharge_power(&self, soc: f64, max_rate: f64) -> f64 {
        let max_rate = max_rate.abs();
        let soc = soc.clamp(0.0, 1.0);
        if soc <= 0.0 {
            return 0.0;
        }

        let (c, k, q_max) = (self.c, self.k, self.q_max);
        let q_total = soc * q_max;
        let q1 = c * q_total;
        let q2 = (1.0 - c) * q_total;

        let conductance_flow = if c < 1.0 {
            k * (q2 / (1.0 - c) - q1 / c)
        } else {
            0.0
        };

        let kinetic_limit_kw = (q1 * k / c + conductance_flow.max(0.0)).max(0.0);

        const TAPER_END: f64 = 0.15;
        let soc_limit = if soc > TAPER_END {
            max_rate
        } else {
            max_rate * soc / TAPER_END
        };

        max_rate.min(kinetic_limit_kw).min(soc_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> KiBaMModel {
        KiBaMModel::new(100.0, 0.7, 0.5).unwrap()
    }

    #[test]
    fn rejects_out_of_range_c() {
        assert!(KiBaMModel::new(100.0, 1.2, 0.5).is_err());
        assert!(KiBaMModel::new(100.0, 0.7, -1.0).is_err());
    }

    #[test]
    fn high_rate_extracts_less_than_nameplate() {
        let m = model();
        let slow = m.available_capacity(10.0, 10.0);
        let fast = m.available_capacity(100.0, 1.0);
        assert!(fast < slow);
        assert!(fast <= m.q_max);
    }

    #[test]
    fn charge_power_tapers_near_full() {
        let m = model();
        let mid = m.max_charge_power(0.5, 50.0);
        let near_full = m.max_charge_power(0.99, 50.0);
        assert!(near_full < mid);
        assert_eq!(m.max_charge_power(1.0, 50.0), 0.0);
    }

    #[test]
    fn discharge_power_tapers_near_empty() {
        let m = model();
        let mid = m.max_discharge_power(0.5, 50.0);
        let near_empty = m.max_discharge_power(0.01, 50.0);
        assert!(near_empty < mid);
        assert_eq!(m.max_discharge_power(0.0, 50.0), 0.0);
    }
}
