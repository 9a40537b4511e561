//! Load-following dispatch.
//!
//! The generator, when present, only ever covers the instantaneous
//! shortfall after the battery has discharged — it is never run ahead of
//! load to recharge the battery. That is [`super::cycle_charging`]'s job.

use microgrid_core::timeseries::{month_and_hour_of_day, HOURS_PER_YEAR};
use microgrid_core::units::Kilowatts;

use crate::battery::BatterySystem;
use crate::generator::diesel::DieselGenerator;
use crate::grid::connection::GridConnection;

use super::{DispatchMode, DispatchResult};

/// Runs load-following dispatch over the reference year.
///
/// Surplus hours: charge the battery, export the remainder to the grid,
/// curtail what's left, and stop the generator if it was running.
/// Deficit hours: discharge the battery, run the generator sized to the
/// remaining shortfall, import from the grid, and whatever's still short
/// is unmet load.
pub fn run(
    load_kw: &[f64],
    re_output_kw: &[f64],
    mut battery: Option<&mut BatterySystem>,
    mut generator: Option<&mut DieselGenerator>,
    mut grid: Option<&mut GridConnection>,
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

        if net >= 0.0 {
            let mut surplus = net;

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
            result.dispatch_mode[t] = DispatchMode::LoadFollowing;

            if let Some(g) = generator.as_deref_mut() {
                if gen_was_running {
                    g.stop();
                    gen_was_running = false;
                }
            }
        } else {
            let mut deficit = -net;

            if let Some(batt) = battery.as_deref_mut() {
                if deficit > 0.0 {
                    let delivered = batt.discharge(Kilowatts::new(deficit), 1.0).value();
                    result.battery_power_kw[t] = delivered;
                    deficit -= delivered;
                }
            }

            if let Some(gen) = generator.as_deref_mut() {
                if deficit > 0.0 {
                    let hour = gen.simulate_hour(deficit, gen_was_running);
                    result.generator_output_kw[t] = hour.output_kw;
                    result.fuel_l[t] = hour.fuel_l;
                    result.generator_cost[t] = hour.cost;
                    gen_was_running = hour.is_running;
                    deficit -= hour.output_kw;
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
            result.dispatch_mode[t] = DispatchMode::LoadFollowing;
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
            initial_soc: 0.5,
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
    fn no_components_reports_all_surplus_as_excess_and_all_deficit_as_unmet() {
        let load = vec![10.0; HOURS_PER_YEAR];
        let mut re = vec![5.0; HOURS_PER_YEAR];
        re[0] = 20.0;

        let result = run(&load, &re, None, None, None);
        assert!((result.unmet_kw[1] - 5.0).abs() < 1e-9);
        assert!((result.excess_kw[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn battery_absorbs_surplus_before_curtailing() {
        let load = vec![0.0; HOURS_PER_YEAR];
        let re = vec![10.0; HOURS_PER_YEAR];
        let mut batt = BatterySystem::new(&battery_config()).unwrap();

        let result = run(&load, &re, Some(&mut batt), None, None);
        assert!(result.battery_power_kw[0] < 0.0);
        assert!(result.excess_kw[0] < 10.0);
    }

    #[test]
    fn generator_covers_deficit_after_battery_is_exhausted() {
        let load = vec![80.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let mut batt = BatterySystem::new(&battery_config()).unwrap();
        let mut gen = DieselGenerator::new(&generator_config()).unwrap();

        let result = run(&load, &re, Some(&mut batt), Some(&mut gen), None);
        assert!(result.generator_output_kw[5] > 0.0);
        assert!((result.unmet_kw.iter().sum::<f64>()) >= 0.0);
    }
}
