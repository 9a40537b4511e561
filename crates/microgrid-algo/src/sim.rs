//! Top-level run orchestration: wires weather+load through PV/wind,
//! dispatch, economics, and (optionally) the network solver in the fixed
//! order the engine always follows.

use microgrid_core::config::{
    BatteryConfig, ComponentConfig, DieselGeneratorConfig, GridConnectionConfig, LoadProfile,
    ProjectConfig, SolarPvConfig, WeatherBundle, WindTurbineConfig,
};
use microgrid_core::error::{CoreError, CoreResult};
use microgrid_core::grid_code::GridCodeProfile;
use microgrid_core::network::NetworkModel;
use microgrid_core::timeseries::{month_and_hour_of_day, HourlySeries, HOURS_PER_YEAR};
use serde::{Deserialize, Serialize};

use crate::battery::BatterySystem;
use crate::contingency::{self, ContingencyAnalysisResult};
use crate::dispatch::{self, DispatchResult};
use crate::economics::{self, AnnualDispatchTotals, ComponentCostInput, EconomicsResult};
use crate::generator::diesel::DieselGenerator;
use crate::grid::connection::GridConnection;
use crate::grid::tariff::Tariff;
use crate::power_flow::{self, PowerFlowResult};
use crate::solar::{self, ModuleParams};
use crate::wind;

/// Selects which of the four dispatch strategies a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    LoadFollowing,
    CycleCharging {
        /// SOC threshold below which the generator runs at full rated power.
        soc_threshold_bp: u32,
    },
    Combined {
        critical_soc_bp: u32,
        recovery_soc_bp: u32,
    },
    LpOptimal,
}

impl Default for DispatchStrategy {
    fn default() -> Self {
        DispatchStrategy::LoadFollowing
    }
}

/// Everything one simulation run needs: the component fleet, site inputs,
/// and (optionally) the electrical network to solve power flow over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub components: Vec<ComponentConfig>,
    pub weather: WeatherBundle,
    pub load: LoadProfile,
    pub project: ProjectConfig,
    pub tariff: Tariff,
    pub latitude_deg: f64,
    pub pv_module: ModuleParams,
    pub pv_degradation_per_year: f64,
    pub network: Option<NetworkModel>,
    pub grid_code: Option<GridCodeProfile>,
}

/// Full output of one run: the dispatch time series, lifetime economics,
/// and an optional power-flow / N-1 contingency solution.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub pv_output_kw: HourlySeries,
    pub wind_output_kw: HourlySeries,
    pub dispatch: DispatchResult,
    pub economics: EconomicsResult,
    pub power_flow: Option<PowerFlowResult>,
    pub contingency: Option<ContingencyAnalysisResult>,
}

/// Runs the full pipeline: PV/wind simulation, dispatch under `strategy`,
/// lifetime economics, and — if `scenario.network` is set — an AC power
/// flow with N-1 contingency screening on top of the resulting injections.
pub fn run(scenario: &ScenarioConfig, strategy: DispatchStrategy) -> CoreResult<SimulationResult> {
    for c in &scenario.components {
        c.validate()?;
    }

    let load_kw = scenario.load.demand_kw.as_slice().to_vec();
    if load_kw.len() != HOURS_PER_YEAR {
        return Err(CoreError::shape("load", HOURS_PER_YEAR, load_kw.len()));
    }

    let pv_output_kw = simulate_pv(scenario);
    let wind_output_kw = simulate_wind(scenario);

    let re_output_kw: Vec<f64> = pv_output_kw
        .as_slice()
        .iter()
        .zip(wind_output_kw.as_slice())
        .map(|(&p, &w)| p + w)
        .collect();

    let battery_cfg = find_battery(&scenario.components);
    let generator_cfg = find_generator(&scenario.components);
    let grid_cfg = find_grid(&scenario.components);

    let mut battery = battery_cfg.map(BatterySystem::new).transpose()?;
    let mut generator = generator_cfg.map(DieselGenerator::new).transpose()?;
    let mut grid = grid_cfg
        .map(|cfg| GridConnection::new(cfg, scenario.tariff.clone()))
        .transpose()?;

    let dispatch_result = run_dispatch(
        strategy,
        &load_kw,
        &re_output_kw,
        battery.as_mut(),
        generator.as_mut(),
        grid.as_mut(),
        battery_cfg,
        generator_cfg,
        grid_cfg,
        &scenario.tariff,
    )?;

    let totals = annual_totals(&load_kw, &dispatch_result);
    let components = component_cost_inputs(&scenario.components);
    let grid_co2 = grid_cfg.map(|c| c.grid_co2_intensity_kg_per_kwh).unwrap_or(0.0);
    let baseline_grid_cost_annual = baseline_grid_only_cost(&load_kw, &scenario.tariff);

    let economics_result = economics::evaluate(
        &components,
        &totals,
        grid_co2,
        baseline_grid_cost_annual,
        &scenario.project,
    );

    let (power_flow, contingency) = match (&scenario.network, &scenario.grid_code) {
        (Some(network), Some(grid_code)) => {
            let pf = power_flow::ac_pf::solve(network, None, None);
            let pf = if pf.converged {
                pf
            } else {
                power_flow::dc_fallback::solve(network)
            };
            let cont = contingency::run(network, grid_code);
            (Some(pf), Some(cont))
        }
        (Some(network), None) => {
            let pf = power_flow::ac_pf::solve(network, None, None);
            let pf = if pf.converged {
                pf
            } else {
                power_flow::dc_fallback::solve(network)
            };
            (Some(pf), None)
        }
        _ => (None, None),
    };

    Ok(SimulationResult {
        pv_output_kw,
        wind_output_kw,
        dispatch: dispatch_result,
        economics: economics_result,
        power_flow,
        contingency,
    })
}

fn simulate_pv(scenario: &ScenarioConfig) -> HourlySeries {
    match find_pv(&scenario.components) {
        Some(cfg) => solar::simulate(
            cfg,
            &scenario.weather,
            scenario.latitude_deg,
            &scenario.pv_module,
            scenario.pv_degradation_per_year,
            0,
        ),
        None => HourlySeries::zeros(),
    }
}

fn simulate_wind(scenario: &ScenarioConfig) -> HourlySeries {
    match find_wind(&scenario.components) {
        Some(cfg) => wind::simulate(cfg, &scenario.weather, cfg.quantity),
        None => HourlySeries::zeros(),
    }
}

fn find_pv(components: &[ComponentConfig]) -> Option<&SolarPvConfig> {
    components.iter().find_map(|c| match c {
        ComponentConfig::SolarPv(cfg) => Some(cfg),
        _ => None,
    })
}

fn find_wind(components: &[ComponentConfig]) -> Option<&WindTurbineConfig> {
    components.iter().find_map(|c| match c {
        ComponentConfig::WindTurbine(cfg) => Some(cfg),
        _ => None,
    })
}

fn find_battery(components: &[ComponentConfig]) -> Option<&BatteryConfig> {
    components.iter().find_map(|c| match c {
        ComponentConfig::Battery(cfg) => Some(cfg),
        _ => None,
    })
}

fn find_generator(components: &[ComponentConfig]) -> Option<&DieselGeneratorConfig> {
    components.iter().find_map(|c| match c {
        ComponentConfig::DieselGenerator(cfg) => Some(cfg),
        _ => None,
    })
}

fn find_grid(components: &[ComponentConfig]) -> Option<&GridConnectionConfig> {
    components.iter().find_map(|c| match c {
        ComponentConfig::GridConnection(cfg) => Some(cfg),
        _ => None,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_dispatch(
    strategy: DispatchStrategy,
    load_kw: &[f64],
    re_output_kw: &[f64],
    battery: Option<&mut BatterySystem>,
    generator: Option<&mut DieselGenerator>,
    grid: Option<&mut GridConnection>,
    battery_cfg: Option<&BatteryConfig>,
    generator_cfg: Option<&DieselGeneratorConfig>,
    grid_cfg: Option<&GridConnectionConfig>,
    tariff: &Tariff,
) -> CoreResult<DispatchResult> {
    match strategy {
        DispatchStrategy::LoadFollowing => Ok(dispatch::load_following::run(
            load_kw,
            re_output_kw,
            battery,
            generator,
            grid,
        )),
        DispatchStrategy::CycleCharging { soc_threshold_bp } => Ok(dispatch::cycle_charging::run(
            load_kw,
            re_output_kw,
            battery,
            generator,
            grid,
            soc_threshold_bp as f64 / 10_000.0,
        )),
        DispatchStrategy::Combined {
            critical_soc_bp,
            recovery_soc_bp,
        } => dispatch::combined::run(
            load_kw,
            re_output_kw,
            battery,
            generator,
            grid,
            critical_soc_bp as f64 / 10_000.0,
            recovery_soc_bp as f64 / 10_000.0,
        ),
        DispatchStrategy::LpOptimal => {
            let grid_limits = grid_cfg.map(|cfg| dispatch::lp_optimal::GridLimits {
                max_import_kw: cfg.max_import_kw,
                max_export_kw: cfg.max_export_kw,
                sell_back_enabled: cfg.sell_back_enabled,
            });
            dispatch::lp_optimal::run(
                load_kw,
                re_output_kw,
                battery_cfg,
                generator_cfg,
                grid_limits.as_ref().map(|g| (g, tariff)),
            )
        }
    }
}

fn annual_totals(load_kw: &[f64], dispatch: &DispatchResult) -> AnnualDispatchTotals {
    AnnualDispatchTotals {
        load_kwh: load_kw.iter().sum(),
        fuel_l: dispatch.total_fuel_l(),
        fuel_cost: dispatch.generator_cost.iter().sum(),
        grid_import_kwh: dispatch.total_grid_import_kwh(),
        grid_import_cost: dispatch.grid_import_cost.iter().sum(),
        grid_export_revenue: dispatch.grid_export_revenue.iter().sum(),
        demand_charges: 0.0,
        non_renewable_gen_kwh: dispatch.total_generator_kwh(),
    }
}

fn component_cost_inputs(components: &[ComponentConfig]) -> Vec<ComponentCostInput> {
    components
        .iter()
        .filter_map(|c| match c {
            ComponentConfig::SolarPv(cfg) => Some(ComponentCostInput {
                name: cfg.name.clone(),
                capital_cost: cfg.capital_cost_per_kw * cfg.rated_kw,
                om_cost_per_year: cfg.om_cost_per_kw_year * cfg.rated_kw,
                lifetime_years: cfg.lifetime_years,
                replacement_cost: cfg.capital_cost_per_kw * cfg.rated_kw,
            }),
            ComponentConfig::WindTurbine(cfg) => {
                let total_kw = cfg.rated_kw * cfg.quantity as f64;
                Some(ComponentCostInput {
                    name: cfg.name.clone(),
                    capital_cost: cfg.capital_cost_per_kw * total_kw,
                    om_cost_per_year: cfg.om_cost_per_kw_year * total_kw,
                    lifetime_years: cfg.lifetime_years,
                    replacement_cost: cfg.capital_cost_per_kw * total_kw,
                })
            }
            ComponentConfig::Battery(cfg) => Some(ComponentCostInput {
                name: cfg.name.clone(),
                capital_cost: cfg.capital_cost_per_kwh * cfg.nominal_capacity_kwh,
                om_cost_per_year: cfg.om_cost_per_kwh_year * cfg.nominal_capacity_kwh,
                lifetime_years: cfg.lifetime_years,
                replacement_cost: cfg.replacement_cost_per_kwh * cfg.nominal_capacity_kwh,
            }),
            ComponentConfig::DieselGenerator(cfg) => Some(ComponentCostInput {
                name: cfg.name.clone(),
                capital_cost: cfg.capital_cost_per_kw * cfg.rated_kw,
                om_cost_per_year: 0.0,
                lifetime_years: cfg.lifetime_hours / 8_760.0,
                replacement_cost: cfg.capital_cost_per_kw * cfg.rated_kw,
            }),
            ComponentConfig::GridConnection(_) => None,
        })
        .collect()
}

/// The counterfactual annual cost of serving the whole load from the grid
/// alone, at the scenario's tariff, ignoring demand charges and losses.
/// Used as the IRR/payback baseline the hybrid system is compared against.
fn baseline_grid_only_cost(load_kw: &[f64], tariff: &Tariff) -> f64 {
    (0..HOURS_PER_YEAR)
        .map(|t| {
            let (month, hod) = month_and_hour_of_day(t);
            load_kw[t] * tariff.buy_price(hod, month)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_weather() -> WeatherBundle {
        WeatherBundle {
            ghi_w_m2: HourlySeries::zeros(),
            dni_w_m2: HourlySeries::zeros(),
            ambient_temp_c: HourlySeries::zeros(),
            wind_speed_ms: HourlySeries::zeros(),
        }
    }

    fn flat_load(kw: f64) -> LoadProfile {
        LoadProfile {
            name: "load".into(),
            demand_kw: HourlySeries::new("load", vec![kw; HOURS_PER_YEAR]).unwrap(),
        }
    }

    #[test]
    fn grid_only_scenario_imports_the_whole_load() {
        let scenario = ScenarioConfig {
            components: vec![ComponentConfig::GridConnection(GridConnectionConfig::default())],
            weather: zero_weather(),
            load: flat_load(10.0),
            project: ProjectConfig::default(),
            tariff: Tariff::flat(0.12, 0.08),
            latitude_deg: 10.0,
            pv_module: ModuleParams::default(),
            pv_degradation_per_year: 0.005,
            network: None,
            grid_code: None,
        };

        let result = run(&scenario, DispatchStrategy::LoadFollowing).unwrap();
        assert!((result.dispatch.total_grid_import_kwh() - 87_600.0).abs() < 1e-3);
        assert!(result.economics.npc > 0.0);
    }

    #[test]
    fn no_components_reports_all_load_as_unmet() {
        let scenario = ScenarioConfig {
            components: vec![],
            weather: zero_weather(),
            load: flat_load(10.0),
            project: ProjectConfig::default(),
            tariff: Tariff::flat(0.12, 0.08),
            latitude_deg: 10.0,
            pv_module: ModuleParams::default(),
            pv_degradation_per_year: 0.005,
            network: None,
            grid_code: None,
        };

        let result = run(&scenario, DispatchStrategy::LoadFollowing).unwrap();
        assert!((result.dispatch.total_unmet_kwh() - 87_600.0).abs() < 1e-3);
    }
}
