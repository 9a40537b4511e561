//! Network power-flow solvers: Newton-Raphson AC, DC fallback, and
//! IEC 60909 simplified short-circuit.

pub mod ac_pf;
pub mod dc_fallback;
pub mod short_circuit;

use microgrid_core::network::NetworkModel;

/// Per-branch flow result reported alongside the bus solution.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BranchFlow {
    pub branch_index: usize,
    pub from_p_pu: f64,
    pub from_q_pu: f64,
    pub to_p_pu: f64,
    pub to_q_pu: f64,
    pub loss_p_pu: f64,
    pub loss_q_pu: f64,
    pub loading_pct: f64,
}

/// Result of an AC or DC power-flow solve.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PowerFlowResult {
    pub converged: bool,
    pub iterations: usize,
    pub max_mismatch: f64,
    pub voltage_pu: Vec<f64>,
    pub voltage_angle_rad: Vec<f64>,
    pub p_inject_pu: Vec<f64>,
    pub q_inject_pu: Vec<f64>,
    pub branch_flows: Vec<BranchFlow>,
}

impl PowerFlowResult {
    pub fn voltage_at(&self, bus_idx: usize) -> num_complex::Complex64 {
        num_complex::Complex64::from_polar(self.voltage_pu[bus_idx], self.voltage_angle_rad[bus_idx])
    }

    pub fn max_branch_loading_pct(&self) -> f64 {
        self.branch_flows
            .iter()
            .map(|b| b.loading_pct)
            .fold(0.0, f64::max)
    }
}

/// Computes per-branch flows, losses, and thermal loading from a solved
/// bus-voltage state. Shared by both the AC and DC solvers since branch
/// flow recovery only needs V, theta, and the Y-bus/branch data.
pub fn build_branch_flows(network: &NetworkModel, v: &[f64], theta: &[f64]) -> Vec<BranchFlow> {
    use num_complex::Complex64;

    let v_complex: Vec<Complex64> = v
        .iter()
        .zip(theta.iter())
        .map(|(&mag, &ang)| Complex64::from_polar(mag, ang))
        .collect();

    network
        .branches
        .iter()
        .enumerate()
        .map(|(idx, branch)| {
            if branch.z_pu.norm() < 1e-12 {
                return BranchFlow {
                    branch_index: idx,
                    from_p_pu: 0.0,
                    from_q_pu: 0.0,
                    to_p_pu: 0.0,
                    to_q_pu: 0.0,
                    loss_p_pu: 0.0,
                    loss_q_pu: 0.0,
                    loading_pct: 0.0,
                };
            }

            let y = branch.y_series();
            let t = branch.tap_ratio;
            let (vi, vj) = (v_complex[branch.from], v_complex[branch.to]);

            let i_ij = y / t.norm_sqr() * vi - y / t.conj() * vj;
            let i_ji = y * vj - y / t * vi;

            let s_ij = vi * i_ij.conj();
            let s_ji = vj * i_ji.conj();
            let loss_s = s_ij + s_ji;

            let loading_pct = if branch.thermal_rating_mva.value() > 0.0 {
                let max_flow = s_ij.norm().max(s_ji.norm());
                max_flow / branch.thermal_rating_mva.value() * 100.0
            } else {
                0.0
            };

            BranchFlow {
                branch_index: idx,
                from_p_pu: s_ij.re,
                from_q_pu: s_ij.im,
                to_p_pu: -s_ji.re,
                to_q_pu: -s_ji.im,
                loss_p_pu: loss_s.re,
                loss_q_pu: loss_s.im,
                loading_pct,
            }
        })
        .collect()
}
