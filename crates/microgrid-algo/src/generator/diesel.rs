//! Diesel generator dispatch and lifecycle tracking.
//!
//! Enforces minimum-load loading, tracks cumulative runtime statistics, and
//! accounts for start/stop costs separately from variable fuel+O&M cost.

use microgrid_core::config::DieselGeneratorConfig;
use microgrid_core::error::{CoreError, CoreResult};

use super::fuel_curve::FuelCurve;

pub struct DieselGenerator {
    pub rated_power_kw: f64,
    pub min_load_ratio: f64,
    pub fuel_curve: FuelCurve,
    pub fuel_price: f64,
    pub om_cost_per_hour: f64,
    pub start_cost: f64,

    running_hours: f64,
    fuel_consumed_total: f64,
    starts_count: u64,
    is_running: bool,
}

/// Result of a single hourly dispatch step.
#[derive(Debug, Clone, Copy)]
pub struct HourResult {
    pub output_kw: f64,
    pub fuel_l: f64,
    pub cost: f64,
    pub is_running: bool,
}

impl DieselGenerator {
    pub fn new(config: &DieselGeneratorConfig) -> CoreResult<Self> {
        if config.rated_kw <= 0.0 {
            return Err(CoreError::config("rated_kw", "must be > 0"));
        }
        if !(0.0 < config.min_load_ratio && config.min_load_ratio < 1.0) {
            return Err(CoreError::config("min_load_ratio", "must be in (0, 1)"));
        }
        let fuel_curve = FuelCurve::new(config.fuel_curve_a0, config.fuel_curve_a1)?;
        Ok(Self {
            rated_power_kw: config.rated_kw,
            min_load_ratio: config.min_load_ratio,
            fuel_curve,
            fuel_price: config.fuel_price_per_l,
            om_cost_per_hour: config.om_cost_per_hour,
            start_cost: config.start_cost,
            running_hours: 0.0,
            fuel_consumed_total: 0.0,
            starts_count: 0,
            is_running: false,
        })
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn min_power_kw(&self) -> f64 {
        self.rated_power_kw * self.min_load_ratio
    }

    /// Starts the generator, returning the start cost (0.0 if already running).
    pub fn start(&mut self) -> f64 {
        if self.is_running {
            return 0.0;
        }
        self.is_running = true;
        self.starts_count += 1;
        self.start_cost
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// Dispatches the generator (must already be running) at the requested
    /// output, clamped to `[min_power_kw, rated_power_kw]`.
    pub fn dispatch(&mut self, power_request_kw: f64) -> CoreResult<(f64, f64, f64)> {
        if !self.is_running {
            return Err(CoreError::Contract(
                "dispatch called while generator is not running".into(),
            ));
        }
        let actual_kw = if power_request_kw < self.min_power_kw() {
            self.min_power_kw()
        } else if power_request_kw > self.rated_power_kw {
            self.rated_power_kw
        } else {
            power_request_kw
        };

        let fuel_l = self.fuel_curve.consumption(actual_kw, self.rated_power_kw);
        let cost = fuel_l * self.fuel_price + self.om_cost_per_hour;

        self.running_hours += 1.0;
        self.fuel_consumed_total += fuel_l;

        Ok((actual_kw, fuel_l, cost))
    }

    /// One-hour wrapper with automatic start/stop: zero request shuts the
    /// generator down, any positive request starts it (if needed) and
    /// dispatches at the requested power subject to min/max limits.
    pub fn simulate_hour(&mut self, power_request_kw: f64, was_running: bool) -> HourResult {
        self.is_running = was_running;

        if power_request_kw <= 0.0 {
            if self.is_running {
                self.stop();
            }
            return HourResult {
                output_kw: 0.0,
                fuel_l: 0.0,
                cost: 0.0,
                is_running: false,
            };
        }

        let startup_cost = if !self.is_running { self.start() } else { 0.0 };
        let (output_kw, fuel_l, variable_cost) = self
            .dispatch(power_request_kw)
            .expect("generator was just started or already running");

        HourResult {
            output_kw,
            fuel_l,
            cost: variable_cost + startup_cost,
            is_running: true,
        }
    }

    pub fn total_fuel_cost(&self) -> f64 {
        self.fuel_consumed_total * self.fuel_price
    }

    pub fn total_om_cost(&self) -> f64 {
        self.running_hours * self.om_cost_per_hour
    }

    pub fn total_start_cost(&self) -> f64 {
        self.starts_count as f64 * self.start_cost
    }

    pub fn running_hours(&self) -> f64 {
        self.running_hours
    }

    pub fn reset_accumulators(&mut self) {
        self.running_hours = 0.0;
        self.fuel_consumed_total = 0.0;
        self.starts_count = 0;
        self.is_running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DieselGeneratorConfig {
        DieselGeneratorConfig {
            name: "d1".into(),
            rated_kw: 100.0,
            min_load_ratio: 0.3,
            fuel_price_per_l: 1.2,
            fuel_curve_a0: 0.0845,
            fuel_curve_a1: 0.2460,
            om_cost_per_hour: 2.0,
            start_cost: 5.0,
            ..DieselGeneratorConfig::default()
        }
    }

    #[test]
    fn dispatch_before_start_is_a_contract_violation() {
        let mut gen = DieselGenerator::new(&config()).unwrap();
        assert!(gen.dispatch(50.0).is_err());
    }

    #[test]
    fn dispatch_enforces_minimum_load() {
        let mut gen = DieselGenerator::new(&config()).unwrap();
        gen.start();
        let (actual, _, _) = gen.dispatch(5.0).unwrap();
        assert_eq!(actual, gen.min_power_kw());
    }

    #[test]
    fn simulate_hour_charges_start_cost_only_on_transition() {
        let mut gen = DieselGenerator::new(&config()).unwrap();
        let first = gen.simulate_hour(50.0, false);
        let second = gen.simulate_hour(50.0, true);
        assert!(first.cost > second.cost);
        assert!(first.is_running && second.is_running);
    }

    #[test]
    fn zero_request_stops_and_zeros_output() {
        let mut gen = DieselGenerator::new(&config()).unwrap();
        gen.simulate_hour(50.0, false);
        let off = gen.simulate_hour(0.0, true);
        assert_eq!(off.output_kw, 0.0);
        assert!(!off.is_running);
    }
}
