//! N-1 contingency screening: remove each branch in turn, re-solve power
//! flow on the reduced network, and check the result against a grid code's
//! voltage and thermal limits.
//!
//! Each contingency gets a full independent resolve rather than a linearized
//! sensitivity factor (LODF/PTDF) — the network sizes this engine targets
//! are small enough that brute-force re-solving is cheap and it reuses the
//! same AC/DC solvers the base case runs, with no separate linearization
//! error to account for.

use microgrid_core::grid_code::GridCodeProfile;
use microgrid_core::network::NetworkModel;

use crate::power_flow::{ac_pf, dc_fallback, PowerFlowResult};

#[derive(Debug, Clone, serde::Serialize)]
pub struct VoltageViolation {
    pub bus_index: usize,
    pub bus_name: String,
    pub voltage_pu: f64,
    pub limit_type: LimitType,
    pub limit_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LimitType {
    Low,
    High,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ThermalViolation {
    pub branch_index: usize,
    pub loading_pct: f64,
    pub rating_mva: f64,
    pub limit_pct: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContingencyResult {
    pub branch_index: usize,
    pub passed: bool,
    pub converged: bool,
    pub iterations: usize,
    pub max_mismatch: f64,
    pub voltage_violations: Vec<VoltageViolation>,
    pub thermal_violations: Vec<ThermalViolation>,
    pub min_voltage_pu: f64,
    pub max_voltage_pu: f64,
    pub max_loading_pct: f64,
    pub causes_islanding: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContingencyAnalysisResult {
    pub grid_code_name: String,
    pub total_contingencies: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub island_count: usize,
    pub worst_voltage_pu: f64,
    pub worst_voltage_bus: String,
    pub worst_loading_pct: f64,
    pub worst_loading_branch: usize,
    pub contingencies: Vec<ContingencyResult>,
}

impl ContingencyAnalysisResult {
    pub fn n1_secure(&self) -> bool {
        self.failed_count == 0
    }
}

/// Runs N-1 contingency analysis: for every branch, remove it, check for
/// islanding, resolve power flow (falling back to the DC approximation if
/// Newton-Raphson fails to converge), and flag voltage/thermal violations.
pub fn run(network: &NetworkModel, grid_code: &GridCodeProfile) -> ContingencyAnalysisResult {
    let mut contingencies = Vec::with_capacity(network.branches.len());
    let mut worst_voltage = 1.0_f64;
    let mut worst_voltage_bus = String::new();
    let mut worst_loading = 0.0_f64;
    let mut worst_loading_branch = 0usize;
    let mut island_count = 0usize;

    let thermal_limit = grid_code.thermal_limit_pct;

    for branch_index in 0..network.branches.len() {
        let reduced = network.without_branch(branch_index);
        let reachable = reduced.reachable_from_slack();
        let is_connected = reachable.iter().all(|&r| r);

        if !is_connected {
            island_count += 1;
            contingencies.push(ContingencyResult {
                branch_index,
                passed: false,
                converged: false,
                iterations: 0,
                max_mismatch: f64::INFINITY,
                voltage_violations: vec![],
                thermal_violations: vec![],
                min_voltage_pu: 0.0,
                max_voltage_pu: 0.0,
                max_loading_pct: 0.0,
                causes_islanding: true,
            });
            continue;
        }

        let mut pf_result = ac_pf::solve(&reduced, None, None);
        if !pf_result.converged {
            pf_result = dc_fallback::solve(&reduced);
        }

        let (voltage_violations, min_v, max_v) = check_voltage(&reduced, &pf_result, grid_code);
        for violation in &voltage_violations {
            if violation.voltage_pu < worst_voltage {
                worst_voltage = violation.voltage_pu;
                worst_voltage_bus = reduced.buses[violation.bus_index].name.clone();
            }
        }
        if min_v < worst_voltage {
            worst_voltage = min_v;
            if let Some(bus) = reduced
                .buses
                .iter()
                .find(|b| (pf_result.voltage_pu[b.index] - min_v).abs() < 1e-12)
            {
                worst_voltage_bus = bus.name.clone();
            }
        }

        let (thermal_violations, max_loading) = check_thermal(&reduced, &pf_result, thermal_limit);
        if max_loading > worst_loading {
            worst_loading = max_loading;
            if let Some(bf) = pf_result
                .branch_flows
                .iter()
                .find(|bf| (bf.loading_pct - max_loading).abs() < 1e-12)
            {
                worst_loading_branch = bf.branch_index;
            }
        }

        let passed = pf_result.converged && voltage_violations.is_empty() && thermal_violations.is_empty();

        contingencies.push(ContingencyResult {
            branch_index,
            passed,
            converged: pf_result.converged,
            iterations: pf_result.iterations,
            max_mismatch: pf_result.max_mismatch,
            voltage_violations,
            thermal_violations,
            min_voltage_pu: min_v,
            max_voltage_pu: max_v,
            max_loading_pct: max_loading,
            causes_islanding: false,
        });
    }

    let passed_count = contingencies.iter().filter(|c| c.passed).count();
    let failed_count = contingencies.len() - passed_count;

    ContingencyAnalysisResult {
        grid_code_name: grid_code.name.clone(),
        total_contingencies: contingencies.len(),
        passed_count,
        failed_count,
        island_count,
        worst_voltage_pu: worst_voltage,
        worst_voltage_bus,
        worst_loading_pct: worst_loading,
        worst_loading_branch,
        contingencies,
    }
}

fn check_voltage(
    network: &NetworkModel,
    pf_result: &PowerFlowResult,
    grid_code: &GridCodeProfile,
) -> (Vec<VoltageViolation>, f64, f64) {
    let mut violations = Vec::new();
    let mut min_v = f64::INFINITY;
    let mut max_v = 0.0_f64;

    for bus in &network.buses {
        let v = pf_result.voltage_pu[bus.index];
        min_v = min_v.min(v);
        max_v = max_v.max(v);

        let limits = &grid_code.voltage;
        if v < limits.contingency_min_pu.value() {
            violations.push(VoltageViolation {
                bus_index: bus.index,
                bus_name: bus.name.clone(),
                voltage_pu: v,
                limit_type: LimitType::Low,
                limit_value: limits.contingency_min_pu.value(),
            });
        } else if v > limits.contingency_max_pu.value() {
            violations.push(VoltageViolation {
                bus_index: bus.index,
                bus_name: bus.name.clone(),
                voltage_pu: v,
                limit_type: LimitType::High,
                limit_value: limits.contingency_max_pu.value(),
            });
        }
    }

    if min_v.is_infinite() {
        min_v = 0.0;
    }
    (violations, min_v, max_v)
}

fn check_thermal(
    network: &NetworkModel,
    pf_result: &PowerFlowResult,
    thermal_limit_pct: f64,
) -> (Vec<ThermalViolation>, f64) {
    let mut violations = Vec::new();
    let mut max_loading = 0.0_f64;

    for bf in &pf_result.branch_flows {
        max_loading = max_loading.max(bf.loading_pct);
        if bf.loading_pct > thermal_limit_pct {
            violations.push(ThermalViolation {
                branch_index: bf.branch_index,
                loading_pct: bf.loading_pct,
                rating_mva: network.branches[bf.branch_index].thermal_rating_mva.value(),
                limit_pct: thermal_limit_pct,
            });
        }
    }

    (violations, max_loading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use microgrid_core::network::{Branch, BranchType, Bus, BusType};
    use microgrid_core::units::{Kilovolts, MegavoltAmperes, PerUnit};
    use num_complex::Complex64;

    fn radial_three_bus() -> NetworkModel {
        NetworkModel {
            buses: vec![
                Bus {
                    index: 0,
                    name: "slack".into(),
                    bus_type: BusType::Slack,
                    nominal_kv: Kilovolts(11.0),
                    v_setpoint_pu: PerUnit(1.0),
                    v_min_pu: PerUnit(0.95),
                    v_max_pu: PerUnit(1.05),
                    p_gen_pu: 0.0,
                    q_gen_pu: 0.0,
                    p_load_pu: 0.0,
                    q_load_pu: 0.0,
                    sc_mva: Some(MegavoltAmperes(100.0)),
                },
                Bus {
                    index: 1,
                    name: "mid".into(),
                    bus_type: BusType::Pq,
                    nominal_kv: Kilovolts(11.0),
                    v_setpoint_pu: PerUnit(1.0),
                    v_min_pu: PerUnit(0.95),
                    v_max_pu: PerUnit(1.05),
                    p_gen_pu: 0.0,
                    q_gen_pu: 0.0,
                    p_load_pu: 0.1,
                    q_load_pu: 0.02,
                    sc_mva: None,
                },
                Bus {
                    index: 2,
                    name: "end".into(),
                    bus_type: BusType::Pq,
                    nominal_kv: Kilovolts(11.0),
                    v_setpoint_pu: PerUnit(1.0),
                    v_min_pu: PerUnit(0.95),
                    v_max_pu: PerUnit(1.05),
                    p_gen_pu: 0.0,
                    q_gen_pu: 0.0,
                    p_load_pu: 0.1,
                    q_load_pu: 0.02,
                    sc_mva: None,
                },
            ],
            branches: vec![
                Branch {
                    from: 0,
                    to: 1,
                    branch_type: BranchType::Cable,
                    z_pu: Complex64::new(0.01, 0.03),
                    shunt_b_pu: 0.0,
                    tap_ratio: Complex64::new(1.0, 0.0),
                    thermal_rating_mva: MegavoltAmperes(5.0),
                },
                Branch {
                    from: 1,
                    to: 2,
                    branch_type: BranchType::Cable,
                    z_pu: Complex64::new(0.01, 0.03),
                    shunt_b_pu: 0.0,
                    tap_ratio: Complex64::new(1.0, 0.0),
                    thermal_rating_mva: MegavoltAmperes(5.0),
                },
            ],
            s_base_mva: 1.0,
        }
    }

    #[test]
    fn radial_feeder_islands_the_downstream_bus_on_either_branch_outage() {
        let net = radial_three_bus();
        let grid_code = GridCodeProfile::iec_default();
        let result = run(&net, &grid_code);
        assert_eq!(result.total_contingencies, 2);
        assert_eq!(result.island_count, 2);
        assert!(!result.n1_secure());
    }

    #[test]
    fn meshed_network_survives_n_minus_one() {
        let mut net = radial_three_bus();
        net.branches.push(Branch {
            from: 0,
            to: 2,
            branch_type: BranchType::Cable,
            z_pu: Complex64::new(0.02, 0.06),
            shunt_b_pu: 0.0,
            tap_ratio: Complex64::new(1.0, 0.0),
            thermal_rating_mva: MegavoltAmperes(5.0),
        });
        let grid_code = GridCodeProfile::iec_default();
        let result = run(&net, &grid_code);
        assert_eq!(result.total_contingencies, 3);
        assert_eq!(result.island_count, 0);
        assert!(result.n1_secure());
    }
}
