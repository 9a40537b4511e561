//! LP-optimal dispatch, solved to global optimality over the whole
//! reference year at once rather than hour by hour.
//!
//! Seven decision variables per hour (battery charge/discharge, generator
//! output, grid import/export, excess, unmet) plus one state variable
//! (battery SOC in kWh), linked by an energy-balance equality and an SOC
//! continuity equality each hour, with a cyclic constraint that pins the
//! final SOC back to the initial one. The generator's nonlinear fuel curve
//! is linearized around its rated point; minimum-load and start/stop
//! behavior (properties of a MIP, not an LP) are not modeled here — the
//! other three strategies capture those.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};

use microgrid_core::config::{BatteryConfig, DieselGeneratorConfig};
use microgrid_core::error::{CoreError, CoreResult};
use microgrid_core::timeseries::{month_and_hour_of_day, HOURS_PER_YEAR};

use crate::grid::tariff::Tariff;

use super::{DispatchMode, DispatchResult};

/// Penalty in $/kWh applied to unmet load; high enough to discourage it in
/// the optimum while keeping the LP always feasible.
pub const UNMET_PENALTY_PER_KWH: f64 = 10.0;

/// Grid parameters the LP needs; a thinner slice than
/// [`microgrid_core::config::GridConnectionConfig`] since the LP has no use
/// for demand charges or net metering (both non-linear in the variables
/// that matter here).
#[derive(Debug, Clone, Copy)]
pub struct GridLimits {
    pub max_import_kw: f64,
    pub max_export_kw: f64,
    pub sell_back_enabled: bool,
}

pub fn run(
    load_kw: &[f64],
    re_output_kw: &[f64],
    battery: Option<&BatteryConfig>,
    generator: Option<&DieselGeneratorConfig>,
    grid: Option<(&GridLimits, &Tariff)>,
) -> CoreResult<DispatchResult> {
    assert_eq!(load_kw.len(), HOURS_PER_YEAR);
    assert_eq!(re_output_kw.len(), HOURS_PER_YEAR);

    let t_n = HOURS_PER_YEAR;

    let batt_eta = battery.map(|b| b.one_way_efficiency);
    let batt_min_kwh = battery.map(|b| b.min_soc * b.nominal_capacity_kwh);
    let batt_max_kwh = battery.map(|b| b.max_soc * b.nominal_capacity_kwh);
    let batt_initial_kwh = battery.map(|b| b.initial_soc * b.nominal_capacity_kwh);

    let gen_cost_per_kw = generator.map(|g| {
        (g.fuel_curve_a0 * g.fuel_price_per_l + g.om_cost_per_hour / g.rated_kw)
            + g.fuel_curve_a1 * g.fuel_price_per_l
    });

    let mut import_price = vec![0.0; t_n];
    let mut export_price = vec![0.0; t_n];
    if let Some((_, tariff)) = grid {
        for t in 0..t_n {
            let (month, hod) = month_and_hour_of_day(t);
            import_price[t] = tariff.buy_price(hod, month);
            export_price[t] = tariff.sell_price(hod, month);
        }
    }

    let mut vars = variables!();

    let mut batt_ch: Vec<Variable> = Vec::with_capacity(t_n);
    let mut batt_disch: Vec<Variable> = Vec::with_capacity(t_n);
    let mut gen_out: Vec<Variable> = Vec::with_capacity(t_n);
    let mut grid_imp: Vec<Variable> = Vec::with_capacity(t_n);
    let mut grid_exp: Vec<Variable> = Vec::with_capacity(t_n);
    let mut excess: Vec<Variable> = Vec::with_capacity(t_n);
    let mut unmet: Vec<Variable> = Vec::with_capacity(t_n);
    let mut soc_kwh: Vec<Variable> = Vec::with_capacity(t_n);

    for _ in 0..t_n {
        let ch_upper = battery.map(|b| b.max_charge_kw).unwrap_or(0.0);
        let disch_upper = battery.map(|b| b.max_discharge_kw).unwrap_or(0.0);
        let gen_upper = generator.map(|g| g.rated_kw).unwrap_or(0.0);
        let imp_upper = grid.map(|(g, _)| g.max_import_kw).unwrap_or(0.0);
        let exp_upper = grid
            .map(|(g, _)| if g.sell_back_enabled { g.max_export_kw } else { 0.0 })
            .unwrap_or(0.0);

        batt_ch.push(vars.add(variable().min(0.0).max(ch_upper)));
        batt_disch.push(vars.add(variable().min(0.0).max(disch_upper)));
        gen_out.push(vars.add(variable().min(0.0).max(gen_upper)));
        grid_imp.push(vars.add(variable().min(0.0).max(imp_upper)));
        grid_exp.push(vars.add(variable().min(0.0).max(exp_upper)));
        excess.push(vars.add(variable().min(0.0)));
        unmet.push(vars.add(variable().min(0.0)));

        if let (Some(lo), Some(hi)) = (batt_min_kwh, batt_max_kwh) {
            soc_kwh.push(vars.add(variable().min(lo).max(hi)));
        } else {
            soc_kwh.push(vars.add(variable().min(0.0).max(0.0)));
        }
    }

    let mut cost_terms: Vec<Expression> = Vec::with_capacity(t_n * 3);
    for t in 0..t_n {
        if let Some(c) = gen_cost_per_kw {
            cost_terms.push(c * gen_out[t]);
        }
        if grid.is_some() {
            cost_terms.push(import_price[t] * grid_imp[t]);
            cost_terms.push(-export_price[t] * grid_exp[t]);
        }
        cost_terms.push(UNMET_PENALTY_PER_KWH * unmet[t]);
    }
    let cost_expr = cost_terms
        .into_iter()
        .fold(Expression::from(0.0), |acc, term| acc + term);

    let mut problem = vars.minimise(cost_expr).using(clarabel);

    for t in 0..t_n {
        let rhs = load_kw[t] - re_output_kw[t];
        problem = problem.with(constraint!(
            batt_disch[t] - batt_ch[t] + gen_out[t] + grid_imp[t] - grid_exp[t] - excess[t] + unmet[t]
                == rhs
        ));

        if let Some(eta) = batt_eta {
            let inv_eta = 1.0 / eta;
            if t == 0 {
                let initial_kwh = batt_initial_kwh.expect("batt config present");
                problem = problem.with(constraint!(
                    soc_kwh[t] - eta * batt_ch[t] + inv_eta * batt_disch[t] == initial_kwh
                ));
            } else {
                problem = problem.with(constraint!(
                    soc_kwh[t] - soc_kwh[t - 1] - eta * batt_ch[t] + inv_eta * batt_disch[t] == 0.0
                ));
            }
        }
    }

    if let Some(initial_kwh) = batt_initial_kwh {
        problem = problem.with(constraint!(soc_kwh[t_n - 1] == initial_kwh));
    }

    let solution = problem
        .solve()
        .map_err(|e| CoreError::Solver(format!("LP dispatch solver failed: {e:?}")))?;

    let mut result = DispatchResult::zeros();
    let capacity_kwh = battery.map(|b| b.nominal_capacity_kwh).unwrap_or(1.0);

    for t in 0..t_n {
        let ch = solution.value(batt_ch[t]).max(0.0);
        let disch = solution.value(batt_disch[t]).max(0.0);
        result.battery_power_kw[t] = disch - ch;
        result.battery_soc[t] = if battery.is_some() {
            (solution.value(soc_kwh[t]) / capacity_kwh).clamp(0.0, 1.0)
        } else {
            0.0
        };

        result.generator_output_kw[t] = solution.value(gen_out[t]).max(0.0);
        if let Some(g) = generator {
            let fuel_l = g.fuel_curve_a0 * g.rated_kw + g.fuel_curve_a1 * result.generator_output_kw[t];
            let fuel_l = if result.generator_output_kw[t] > 1e-9 { fuel_l } else { 0.0 };
            result.fuel_l[t] = fuel_l;
            result.generator_cost[t] = fuel_l * g.fuel_price_per_l
                + if result.generator_output_kw[t] > 1e-9 { g.om_cost_per_hour } else { 0.0 };
        }

        result.grid_import_kw[t] = solution.value(grid_imp[t]).max(0.0);
        result.grid_export_kw[t] = solution.value(grid_exp[t]).max(0.0);
        if grid.is_some() {
            result.grid_import_cost[t] = result.grid_import_kw[t] * import_price[t];
            result.grid_export_revenue[t] = result.grid_export_kw[t] * export_price[t];
        }

        result.excess_kw[t] = solution.value(excess[t]).max(0.0);
        result.unmet_kw[t] = solution.value(unmet[t]).max(0.0);
        result.dispatch_mode[t] = DispatchMode::LoadFollowing;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn flat_load_with_only_grid_imports_exactly_the_deficit() {
        let load = vec![10.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let limits = GridLimits {
            max_import_kw: 1000.0,
            max_export_kw: 0.0,
            sell_back_enabled: false,
        };
        let tariff = Tariff::flat(0.12, 0.0);

        let result = run(&load, &re, None, None, Some((&limits, &tariff))).unwrap();
        assert!((result.grid_import_kw[100] - 10.0).abs() < 1e-4);
        assert!(result.unmet_kw.iter().all(|&u| u.abs() < 1e-4));
    }

    #[test]
    fn battery_recharges_to_initial_soc_by_year_end() {
        let load = vec![5.0; HOURS_PER_YEAR];
        let mut re = vec![5.0; HOURS_PER_YEAR];
        re[0] = 40.0;
        let batt = battery_config();

        let result = run(&load, &re, Some(&batt), None, None).unwrap();
        let final_soc = result.battery_soc[HOURS_PER_YEAR - 1];
        assert!((final_soc - batt.initial_soc).abs() < 1e-3);
    }

    #[test]
    fn generator_covers_deficit_when_cheaper_than_unmet_penalty() {
        let load = vec![50.0; HOURS_PER_YEAR];
        let re = vec![0.0; HOURS_PER_YEAR];
        let gen = generator_config();

        let result = run(&load, &re, None, Some(&gen), None).unwrap();
        assert!(result.generator_output_kw.iter().sum::<f64>() > 0.0);
    }
}
