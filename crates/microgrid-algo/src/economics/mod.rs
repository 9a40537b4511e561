//! Lifetime economic evaluation: NPC, LCOE, IRR, payback, and cost
//! breakdowns from component cost inputs and annual dispatch outcomes.
//!
//! Deliberately simpler than the original platform's `financing.py`
//! WACC/loan-amortization machinery: capital is assumed paid in full at
//! year 0, annual opex is discounted by a single annuity factor, and
//! replacements/salvage use straight-line remaining value. See the design
//! notes for why the richer financing model was left out.

use microgrid_core::config::ProjectConfig;

/// One component's contribution to the capital/opex/replacement ledger.
#[derive(Debug, Clone)]
pub struct ComponentCostInput {
    pub name: String,
    pub capital_cost: f64,
    pub om_cost_per_year: f64,
    pub lifetime_years: f64,
    /// Cost of a single mid-life replacement; defaults to `capital_cost`
    /// for components without a distinct replacement price (battery uses
    /// `replacement_cost_per_kwh · capacity` instead).
    pub replacement_cost: f64,
}

/// Annual dispatch-derived quantities the economics module needs, summed
/// over the reference year.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnualDispatchTotals {
    pub load_kwh: f64,
    pub fuel_l: f64,
    pub fuel_cost: f64,
    pub grid_import_kwh: f64,
    pub grid_import_cost: f64,
    pub grid_export_revenue: f64,
    pub demand_charges: f64,
    /// Non-renewable generator output (diesel), consumed by the
    /// renewable-fraction proxy.
    pub non_renewable_gen_kwh: f64,
}

impl AnnualDispatchTotals {
    fn grid_net_cost(&self) -> f64 {
        self.grid_import_cost - self.grid_export_revenue + self.demand_charges
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CostBreakdown {
    pub capital_by_component: Vec<(String, f64)>,
    pub om_npv: f64,
    pub fuel_npv: f64,
    pub grid_npv: f64,
    pub replacement_npv: f64,
    pub salvage_npv: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EconomicsResult {
    pub npc: f64,
    pub lcoe: f64,
    pub irr: Option<f64>,
    pub payback_years: Option<u32>,
    pub renewable_fraction: f64,
    pub co2_emissions_kg: f64,
    pub cost_breakdown: CostBreakdown,
}

const CO2_PER_LITRE_DIESEL_KG: f64 = 2.68;
const IRR_BRACKET_LOW: f64 = -0.99;
const IRR_BRACKET_HIGH: f64 = 10.0;
const IRR_SCAN_STEPS: usize = 400;
const IRR_TOLERANCE: f64 = 1e-7;
const IRR_MAX_BISECTIONS: usize = 100;

/// Annuity factor `AF = (1 - (1+r)^-N) / r`, or `N` when `r = 0`.
pub fn annuity_factor(discount_rate: f64, years: u32) -> f64 {
    let n = years as f64;
    if discount_rate.abs() < 1e-12 {
        n
    } else {
        (1.0 - (1.0 + discount_rate).powf(-n)) / discount_rate
    }
}

/// Evaluates full lifetime economics for one scenario.
pub fn evaluate(
    components: &[ComponentCostInput],
    totals: &AnnualDispatchTotals,
    grid_co2_intensity_kg_per_kwh: f64,
    baseline_grid_cost_annual: f64,
    project: &ProjectConfig,
) -> EconomicsResult {
    let af = annuity_factor(project.discount_rate, project.project_lifetime_years);

    let capital_by_component: Vec<(String, f64)> =
        components.iter().map(|c| (c.name.clone(), c.capital_cost)).collect();
    let total_capital: f64 = capital_by_component.iter().map(|(_, v)| v).sum();

    let annual_om: f64 = components.iter().map(|c| c.om_cost_per_year).sum();
    let annual_fuel = totals.fuel_cost;
    let annual_grid = totals.grid_net_cost();
    let annual_opex = annual_om + annual_fuel + annual_grid;

    let om_npv = af * annual_om;
    let fuel_npv = af * annual_fuel;
    let grid_npv = af * annual_grid;

    let (replacement_npv, salvage_npv) =
        replacements_and_salvage(components, project.discount_rate, project.project_lifetime_years);

    let npc = total_capital + om_npv + fuel_npv + grid_npv + replacement_npv - salvage_npv;

    let lcoe = if af * totals.load_kwh > 1e-9 { npc / (af * totals.load_kwh) } else { f64::INFINITY };

    let annual_savings = baseline_grid_cost_annual - annual_opex;
    let irr = solve_irr(total_capital, annual_savings, project.project_lifetime_years);
    let payback_years = solve_payback(total_capital, annual_savings, project.project_lifetime_years);

    let renewable_fraction = if totals.load_kwh > 1e-9 {
        (1.0 - (totals.non_renewable_gen_kwh + totals.grid_import_kwh) / totals.load_kwh).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let co2_emissions_kg =
        totals.fuel_l * CO2_PER_LITRE_DIESEL_KG + totals.grid_import_kwh * grid_co2_intensity_kg_per_kwh;

    EconomicsResult {
        npc,
        lcoe,
        irr,
        payback_years,
        renewable_fraction,
        co2_emissions_kg,
        cost_breakdown: CostBreakdown {
            capital_by_component,
            om_npv,
            fuel_npv,
            grid_npv,
            replacement_npv,
            salvage_npv,
        },
    }
}

/// Mid-life replacements at `k · lifetime_years` for each component whose
/// lifetime is shorter than the project, each discounted to present, plus
/// the discounted straight-line salvage value of whatever's left at year N.
fn replacements_and_salvage(
    components: &[ComponentCostInput],
    discount_rate: f64,
    project_lifetime_years: u32,
) -> (f64, f64) {
    let n = project_lifetime_years as f64;
    let mut replacement_npv = 0.0;
    let mut salvage_npv = 0.0;

    for c in components {
        if c.lifetime_years <= 0.0 {
            continue;
        }

        if c.lifetime_years < n {
            let mut k = 1u32;
            loop {
                let year = c.lifetime_years * k as f64;
                if year >= n {
                    break;
                }
                replacement_npv += c.replacement_cost / (1.0 + discount_rate).powf(year);
                k += 1;
            }
        }

        // Last install strictly before year n: a unit installed exactly at
        // year n (lifetime divides n evenly) hasn't aged at all yet.
        let mut completed = (n / c.lifetime_years).floor();
        if completed * c.lifetime_years >= n {
            completed -= 1.0;
        }
        let last_replacement_year = completed * c.lifetime_years;
        let used_life = (n - last_replacement_year).max(0.0);
        let remaining_fraction = (1.0 - used_life / c.lifetime_years).clamp(0.0, 1.0);
        let salvage = c.capital_cost * remaining_fraction;
        salvage_npv += salvage / (1.0 + discount_rate).powf(n);
    }

    (replacement_npv, salvage_npv)
}

fn npv_at_rate(capital: f64, annual_savings: f64, rate: f64, years: u32) -> f64 {
    let mut npv = -capital;
    for t in 1..=years {
        npv += annual_savings / (1.0 + rate).powi(t as i32);
    }
    npv
}

/// Bracketed root finder on `NPV(r)` over `[-0.99, 10]`. Scans for a sign
/// change (the function need not be monotonic near `r = -1`), then
/// bisects. Returns `None` if no bracket is found in range.
fn solve_irr(capital: f64, annual_savings: f64, years: u32) -> Option<f64> {
    if years == 0 || capital <= 0.0 {
        return None;
    }

    let step = (IRR_BRACKET_HIGH - IRR_BRACKET_LOW) / IRR_SCAN_STEPS as f64;
    let mut prev_rate = IRR_BRACKET_LOW;
    let mut prev_value = npv_at_rate(capital, annual_savings, prev_rate, years);

    for i in 1..=IRR_SCAN_STEPS {
        let rate = IRR_BRACKET_LOW + step * i as f64;
        let value = npv_at_rate(capital, annual_savings, rate, years);

        if prev_value == 0.0 {
            return Some(prev_rate);
        }
        if prev_value.signum() != value.signum() {
            return Some(bisect(capital, annual_savings, years, prev_rate, rate));
        }

        prev_rate = rate;
        prev_value = value;
    }

    if prev_value == 0.0 {
        Some(prev_rate)
    } else {
        None
    }
}

fn bisect(capital: f64, annual_savings: f64, years: u32, mut lo: f64, mut hi: f64) -> f64 {
    let mut lo_value = npv_at_rate(capital, annual_savings, lo, years);
    for _ in 0..IRR_MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let mid_value = npv_at_rate(capital, annual_savings, mid, years);
        if mid_value.abs() < IRR_TOLERANCE || (hi - lo) < IRR_TOLERANCE {
            return mid;
        }
        if mid_value.signum() == lo_value.signum() {
            lo = mid;
            lo_value = mid_value;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Smallest year where cumulative undiscounted `(savings - capital)` first
/// reaches zero or above; `None` if it never does within the project life.
fn solve_payback(capital: f64, annual_savings: f64, years: u32) -> Option<u32> {
    if annual_savings <= 0.0 {
        return None;
    }
    let mut cumulative = 0.0;
    for year in 1..=years {
        cumulative += annual_savings;
        if cumulative - capital >= 0.0 {
            return Some(year);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectConfig {
        ProjectConfig { discount_rate: 0.08, project_lifetime_years: 25 }
    }

    #[test]
    fn annuity_factor_at_zero_rate_is_years() {
        assert_eq!(annuity_factor(0.0, 20), 20.0);
    }

    #[test]
    fn annuity_factor_matches_hand_calc_at_eight_percent_over_twenty_years() {
        let af = annuity_factor(0.08, 20);
        assert!((af - 9.8181).abs() < 1e-3);
    }

    #[test]
    fn pure_grid_scenario_npc_matches_worked_example() {
        // S1: load = constant 10 kW for 8760h, tariff buy = 0.12 $/kWh, no components.
        let totals = AnnualDispatchTotals {
            load_kwh: 87_600.0,
            grid_import_kwh: 87_600.0,
            grid_import_cost: 87_600.0 * 0.12,
            ..Default::default()
        };
        let project = ProjectConfig { discount_rate: 0.0, project_lifetime_years: 1 };
        let result = evaluate(&[], &totals, 0.0, 0.0, &project);
        assert!((result.npc - 10_512.0).abs() < 1e-6);
        assert!((result.lcoe - 0.12).abs() < 1e-6);
    }

    #[test]
    fn npc_decreases_as_discount_rate_decreases_with_fixed_capacity() {
        let components = vec![ComponentCostInput {
            name: "pv".into(),
            capital_cost: 90_000.0,
            om_cost_per_year: 1_200.0,
            lifetime_years: 25.0,
            replacement_cost: 90_000.0,
        }];
        let totals = AnnualDispatchTotals { load_kwh: 100_000.0, ..Default::default() };

        let high_rate = evaluate(
            &components,
            &totals,
            0.7,
            0.0,
            &ProjectConfig { discount_rate: 0.10, ..project() },
        );
        let low_rate = evaluate(
            &components,
            &totals,
            0.7,
            0.0,
            &ProjectConfig { discount_rate: 0.03, ..project() },
        );
        assert!(low_rate.npc < high_rate.npc);
    }

    #[test]
    fn irr_is_none_outside_the_bracket() {
        // Savings never recover the capital within the project life or
        // any rate in [-0.99, 10] — NPV stays negative everywhere.
        let irr = solve_irr(1_000_000.0, 1.0, 25);
        assert!(irr.is_none());
    }

    #[test]
    fn payback_is_none_when_savings_never_cover_capital() {
        assert!(solve_payback(100_000.0, 1_000.0, 25).is_none());
    }

    #[test]
    fn payback_finds_the_first_qualifying_year() {
        let payback = solve_payback(10_000.0, 2_500.0, 25);
        assert_eq!(payback, Some(4));
    }
}
