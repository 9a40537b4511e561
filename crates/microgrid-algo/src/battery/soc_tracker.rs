//! Coulomb-counting state-of-charge tracker.
//!
//! Round-trip efficiency `eta` is split symmetrically between charge and
//! discharge using `sqrt(eta)`: charging stores `P * sqrt(eta)` of the
//! power injected, discharging must draw `P / sqrt(eta)` internally to
//! deliver `P` to the load.

use microgrid_core::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy)]
pub struct SocTracker {
    capacity_kwh: f64,
    efficiency: f64,
    min_soc: f64,
    max_soc: f64,
    eta_one_way: f64,
    soc: f64,
    initial_soc: f64,
}

impl SocTracker {
    pub fn new(
        capacity_kwh: f64,
        efficiency: f64,
        min_soc: f64,
        max_soc: f64,
        initial_soc: f64,
    ) -> CoreResult<Self> {
        if capacity_kwh <= 0.0 {
            return Err(CoreError::config("capacity_kwh", "must be positive"));
        }
        if !(0.0 < efficiency && efficiency <= 1.0) {
            return Err(CoreError::config("efficiency", "must be in (0, 1]"));
        }
        if !(0.0 <= min_soc && min_soc < max_soc && max_soc <= 1.0) {
            return Err(CoreError::config(
                "min_soc/max_soc",
                "need 0 <= min_soc < max_soc <= 1",
            ));
        }
        let soc = initial_soc.clamp(min_soc, max_soc);
        Ok(Self {
            capacity_kwh,
            efficiency,
            min_soc,
            max_soc,
            eta_one_way: efficiency.sqrt(),
            soc,
            initial_soc: soc,
        })
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    pub fn reset(&mut self) {
        self.soc = self.initial_soc;
    }

    /// Advances one time step. `power_kw >= 0` charges, `power_kw < 0`
    /// discharges. Returns `(actual_power_kw, new_soc)`; the actual power
    /// may be smaller in magnitude than requested if SOC bounds were hit.
    pub fn step(&mut self, power_kw: f64, dt_hours: f64) -> (f64, f64) {
        if dt_hours <= 0.0 {
            return (0.0, self.soc);
        }
        let actual = if power_kw >= 0.0 {
            self.charge(power_kw, dt_hours)
        } else {
            self.discharge(power_kw, dt_hours)
        };
        (actual, self.soc)
    }

    fn charge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        let mut energy_stored = power_kw * dt_hours * self.eta_one_way;
        let room_kwh = (self.max_soc - self.soc) * self.capacity_kwh;
        if energy_stored > room_kwh {
            energy_stored = room_kwh;
        }
        let delta_soc = energy_stored / self.capacity_kwh;
        self.soc = (self.soc + delta_soc).clamp(self.min_soc, self.max_soc);

        if dt_hours > 0.0 && self.eta_one_way > 0.0 {
            energy_stored / (dt_hours * self.eta_one_way)
        } else {
            0.0
        }
    }

    fn discharge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        let requested_magnitude = power_kw.abs();
        let mut energy_internal = requested_magnitude * dt_hours / self.eta_one_way;
        let available_kwh = (self.soc - self.min_soc) * self.capacity_kwh;
        if energy_internal > available_kwh {
            energy_internal = available_kwh;
        }
        let delta_soc = energy_internal / self.capacity_kwh;
        self.soc = (self.soc - delta_soc).clamp(self.min_soc, self.max_soc);

        let actual_magnitude = if dt_hours > 0.0 {
            energy_internal * self.eta_one_way / dt_hours
        } else {
            0.0
        };
        -actual_magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SocTracker {
        SocTracker::new(100.0, 0.9, 0.1, 0.95, 0.5).unwrap()
    }

    #[test]
    fn rejects_inverted_soc_bounds() {
        assert!(SocTracker::new(100.0, 0.9, 0.8, 0.3, 0.5).is_err());
    }

    #[test]
    fn charge_respects_max_soc() {
        let mut t = tracker();
        let (actual, soc) = t.step(1000.0, 1.0);
        assert!(soc <= 0.95 + 1e-9);
        assert!(actual > 0.0);
    }

    #[test]
    fn discharge_respects_min_soc() {
        let mut t = tracker();
        let (actual, soc) = t.step(-1000.0, 1.0);
        assert!(soc >= 0.1 - 1e-9);
        assert!(actual < 0.0);
    }

    #[test]
    fn round_trip_loses_energy_to_efficiency() {
        let mut t = tracker();
        let (charged, _) = t.step(10.0, 1.0);
        let (discharged, _) = t.step(-charged, 1.0);
        assert!(discharged.abs() < charged);
    }

    #[test]
    fn reset_restores_initial_soc() {
        let mut t = tracker();
        t.step(10.0, 1.0);
        t.reset();
        assert_eq!(t.soc(), 0.5);
    }
}
