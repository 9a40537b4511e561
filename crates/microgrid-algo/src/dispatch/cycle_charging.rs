//! Cycle-charging dispatch.
//!
//! The generator, once it needs to run at all, runs at its full rated
//! output rather than load-following the deficit — any excess over the
//! deficit charges the battery instead of idling the generator at partial
//! load. This trades higher per-hour fuel burn for fewer start/stop cycles
//! and faster battery recovery.

use microgrid_core::timeseries::{month_and_hour_of_day, HOURS_PER_YEAR};
use microgrid_core::units::Kilowatts;

use crate::battery::BatterySystem;
use crate::generator::diesel::DieselGenerator;
use crate::grid::connection::GridConnection;

use super::{DispatchMode, DispatchResult};

/// SOC below which the generator is dispatched at full rated power instead
/// of following the deficit, matching the load-following strategy's default
/// absence of this behavior.
pub const DEFAULT_SOC_THRESHOLD: f64 = 0.80;

pub fn run(
    load_kw: &[f64],
    re_output_kw: &[f64],
    mut battery: Option<&mut BatterySystem>,
    mut generator: Option<&mut DieselGenerator>,
    mut grid: Option<&mut GridConnection>,
    soc_threshold: f64,
) -> DispatchResult {
    assert_eq!(load_kw.len(), HOURS_PER_YEAR);
    assert_eq!(re_output_kw.len(), HOURS_PER_YEAR);

    if let Some(g) = generator.as_deref_mut() {
        g.reset_accumulators();
    }
    if let Some(g) = grid.as_deref_mut() {
        g.reset();
    }

    let mut result = DispatchResult::zeros();
    let mut gen_was_running = false;

    for t in 0..HOURS_PER_YEAR {
        let (month, hod) = month_and_hour_of_day(t);
        let net = re_output_kw[t] - load_kw[t];
        let current_soc = battery.as_deref().map(|b| b.soc()).unwrap_or(1.0);

        result.dispatch_mode[t] = DispatchMode::CycleCharging;

        if net >= 0.0 {
            let mut surplus = net;

            if gen_was_running && current_soc < soc_threshold {
                if let Some(gen) = generator.as_deref_mut() {
                    let rated = gen.rated_power_kw;
                    let hour = gen.simulate_hour(rated, gen_was_running);
                    result.generator_output_kw[t] = hour.output_kw;
                    result.fuel_l[t] = hour.fuel_l;
                    result.generator_cost[t] = hour.cost;
                    gen_was_running = hour.is_running;
                    surplus += hour.output_kw;
                }
            } else if gen_was_running {
                if let Some(gen) = generator.as_deref_mut() {
                    gen.stop();
                }
                gen_was_running = false;
            }

            if let Some(batt) = battery.as_deref_mut() {
                if surplus > 0.0 {
                    let accepted = batt.charge(Kilowatts::new(surplus), 1.0).value();
                    surplus -= accepted;
                    result.battery_power_kw[t] = -accepted;
                }
            }

            if let Some(gc) = grid.as_deref_mut() {
                if surplus > 0.0 {
                    let (exported, revenue) = gc.export_power(surplus, hod, month);
                    result.grid_export_kw[t] = exported;
                    result.grid_export_revenue[t] = revenue;
                    surplus -= exported;
                }
            }

            result.excess_kw[t] = surplus.max(0.0);
        } else {
            let mut deficit = -net;
            let run_gen = generator.is_some()
                && (current_soc < soc_threshold || gen_was_running)
                && deficit > 0.0;

            if run_gen {
                let gen = generator.as_deref_mut().expect("checked by run_gen");
                let rated = gen.rated_power_kw;
                let hour = gen.simulate_hour(rated, gen_was_running);
                result.generator_output_kw[t] = hour.output_kw;
                result.fuel_l[t] = hour.fuel_l;
                result.generator_cost[t] = hour.cost;
                gen_was_running = hour.is_running;

                let gen_surplus = hour.output_kw - deficit;
                if gen_surplus > 0.0 {
                    deficit = 0.0;
                    let mut remaining = gen_surplus;

                    if let Some(batt) = battery.as_deref_mut() {
                        let accepted = batt.charge(Kilowatts::new(remaining), 1.0).value();
                        remaining -= accepted;
                        result.battery_power_kw[t] = -accepted;
                    }

                    if let Some(gc) = grid.as_deref_mut() {
                        if remaining > 0.0 {
                            let (exported, revenue) = gc.export_power(remaining, hod, month);
                            result.grid_export_kw[t] = exported;
                            result.grid_export_revenue[t] = revenue;
                            remaining -= exported;
                        }
                    }

                    result.excess_kw[t] = remaining.max(0.0);
                } else {
                    deficit -= hour.output_kw;
                }
            } else if let Some(gen) = generator.as_deref_mut() {
                if gen_was_running {
                    gen.stop();
                    gen_was_running = false;
                }
            }

            if let Some(batt) = battery.as_deref_mut() {
                if deficit > 0.0 {
                    let delivered = batt.discharge(Kilowatts::new(deficit), 1.0).value();
                    result.battery_power_kw[t] += delivered;
                    deficit -= delivered;
                }
            }

            if let Some(gc) = grid.as_deref_mut() {
                if deficit > 0.0 {
                    let (imported, cost) = gc.import_power(deficit, hod, month);
                    result.grid_import_kw[t] = imported;
                    result.grid_import_cost[t] = cost;
                    deficit -= imported;
                }
            }

            result.unmet_kw[t] = deficit.max(0.0);
        }

        if let Some(batt) = battery.as_deref_mut() {
            result.battery_soc[t] = batt.soc();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use microgrid_core::config::{BatteryConfig, DieselGeneratorConfig};

    fn battery_config() -> BatteryConfig {
        BatteryConfig {
            name: "b1".into(),
            nominal_capacity_kwh: 100.0,
            max_charge_kw: 50.0,
            max_discharge_kw: 50.0,
            one_way_efficiency: 0.95,
            min_soc: 0.2,
            max_soc: 1.0,
            initial_soc: 0.3,
            kibam_k: 0.5,
            kibam_c: 0.8,
            ..BatteryConfig::default()
        }
    }

    fn generator_config() -> DieselGeneratorConfig {
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
    fn generator_runs_at_full_rated_power_when_below_threshold() {
        let load = vec![20.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let mut batt = BatterySystem::new(&battery_config()).unwrap();
        let mut gen = DieselGenerator::new(&generator_config()).unwrap();

        let result = run(
            &load,
            &re,
            Some(&mut batt),
            Some(&mut gen),
            None,
            DEFAULT_SOC_THRESHOLD,
        );
        assert!((result.generator_output_kw[0] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn generator_surplus_above_deficit_charges_the_battery() {
        let load = vec![20.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let mut batt = BatterySystem::new(&battery_config()).unwrap();
        let mut gen = DieselGenerator::new(&generator_config()).unwrap();

        let result = run(
            &load,
            &re,
            Some(&mut batt),
            Some(&mut gen),
            None,
            DEFAULT_SOC_THRESHOLD,
        );
        assert!(result.battery_power_kw[0] < 0.0);
    }

    #[test]
    fn generator_stays_off_above_threshold_with_no_deficit() {
        let load = vec![0.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let mut batt = BatterySystem::new(&BatteryConfig {
            initial_soc: 0.9,
            ..battery_config()
        })
        .unwrap();
        let mut gen = DieselGenerator::new(&generator_config()).unwrap();

        let result = run(
            &load,
            &re,
            Some(&mut batt),
            Some(&mut gen),
            None,
            DEFAULT_SOC_THRESHOLD,
        );
        assert_eq!(result.generator_output_kw[0], 0.0);
    }
}
