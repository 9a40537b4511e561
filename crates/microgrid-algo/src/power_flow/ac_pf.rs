//! Newton-Raphson AC power flow.
//!
//! Flat start (`|V|=1.0, θ=0` for PQ buses; PV/slack buses initialised to
//! their setpoints), dense Jacobian with the standard four sub-blocks
//! (`∂P/∂θ`, `∂P/∂|V|`, `∂Q/∂θ`, `∂Q/∂|V|`), solved each iteration by
//! `faer`'s partial-pivot LU. Voltage updates on PQ buses are clamped to
//! `[0.5, 1.5]` for numerical stability.

use faer::prelude::SpSolver;
use faer::Mat;

use microgrid_core::network::{BusType, NetworkModel};

use super::{build_branch_flows, PowerFlowResult};

pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 30;

/// Solves AC power flow via Newton-Raphson. `max_iter` and `tolerance`
/// default to [`DEFAULT_MAX_ITERATIONS`]/[`DEFAULT_TOLERANCE`] when `None`.
pub fn solve(
    network: &NetworkModel,
    max_iter: Option<usize>,
    tolerance: Option<f64>,
) -> PowerFlowResult {
    let max_iter = max_iter.unwrap_or(DEFAULT_MAX_ITERATIONS);
    let tolerance = tolerance.unwrap_or(DEFAULT_TOLERANCE);
    let n = network.buses.len();

    if n == 0 {
        return PowerFlowResult {
            converged: true,
            iterations: 0,
            max_mismatch: 0.0,
            voltage_pu: vec![],
            voltage_angle_rad: vec![],
            p_inject_pu: vec![],
            q_inject_pu: vec![],
            branch_flows: vec![],
        };
    }

    let y_bus = network.build_y_bus();
    let g: Vec<Vec<f64>> = y_bus.iter().map(|row| row.iter().map(|c| c.re).collect()).collect();
    let b: Vec<Vec<f64>> = y_bus.iter().map(|row| row.iter().map(|c| c.im).collect()).collect();

    let mut v = vec![1.0; n];
    let mut theta = vec![0.0; n];
    for bus in &network.buses {
        if matches!(bus.bus_type, BusType::Slack | BusType::Pv) {
            v[bus.index] = bus.v_setpoint_pu.value();
        }
    }

    let p_spec: Vec<f64> = network.buses.iter().map(|bus| bus.net_p_pu()).collect();
    let q_spec: Vec<f64> = network.buses.iter().map(|bus| bus.net_q_pu()).collect();

    let slack_idx = network.slack_index();
    let non_slack: Vec<usize> = (0..n).filter(|&i| i != slack_idx).collect();
    let pq_set: Vec<usize> = network
        .buses
        .iter()
        .filter(|bus| bus.bus_type == BusType::Pq)
        .map(|bus| bus.index)
        .collect();

    let n_p = non_slack.len();
    let n_q = pq_set.len();
    let n_vars = n_p + n_q;

    if n_vars == 0 {
        return build_result(network, &v, &theta, true, 0, 0.0);
    }

    let mut converged = false;
    let mut iterations = 0;
    let mut max_mismatch = f64::INFINITY;

    for iteration in 0..max_iter {
        let (p_calc, q_calc) = calc_power(n, &g, &b, &v, &theta);

        let mut mismatch = vec![0.0; n_vars];
        for (k, &i) in non_slack.iter().enumerate() {
            mismatch[k] = p_spec[i] - p_calc[i];
        }
        for (k, &i) in pq_set.iter().enumerate() {
            mismatch[n_p + k] = q_spec[i] - q_calc[i];
        }

        max_mismatch = mismatch.iter().fold(0.0_f64, |acc, &m| acc.max(m.abs()));
        iterations = iteration + 1;
        if max_mismatch < tolerance {
            converged = true;
            break;
        }

        let jacobian = build_jacobian(&non_slack, &pq_set, &g, &b, &v, &theta, &p_calc, &q_calc);
        let dx = match solve_dense(&jacobian, &mismatch) {
            Some(dx) => dx,
            None => break,
        };

        for (k, &i) in non_slack.iter().enumerate() {
            theta[i] += dx[k];
        }
        for (k, &i) in pq_set.iter().enumerate() {
            v[i] = (v[i] + dx[n_p + k]).clamp(0.5, 1.5);
        }
    }

    build_result(network, &v, &theta, converged, iterations, max_mismatch)
}

fn calc_power(n: usize, g: &[Vec<f64>], b: &[Vec<f64>], v: &[f64], theta: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut p_calc = vec![0.0; n];
    let mut q_calc = vec![0.0; n];
    for i in 0..n {
        for j in 0..n {
            let angle_diff = theta[i] - theta[j];
            p_calc[i] += v[i] * v[j] * (g[i][j] * angle_diff.cos() + b[i][j] * angle_diff.sin());
            q_calc[i] += v[i] * v[j] * (g[i][j] * angle_diff.sin() - b[i][j] * angle_diff.cos());
        }
    }
    (p_calc, q_calc)
}

#[allow(clippy::too_many_arguments)]
fn build_jacobian(
    non_slack: &[usize],
    pq_set: &[usize],
    g: &[Vec<f64>],
    b: &[Vec<f64>],
    v: &[f64],
    theta: &[f64],
    p_calc: &[f64],
    q_calc: &[f64],
) -> Vec<Vec<f64>> {
    let n_p = non_slack.len();
    let n_q = pq_set.len();
    let n_vars = n_p + n_q;
    let mut j = vec![vec![0.0; n_vars]; n_vars];

    // J1: dP/dTheta
    for (ki, &i) in non_slack.iter().enumerate() {
        for (kj, &jj) in non_slack.iter().enumerate() {
            j[ki][kj] = if i == jj {
                -q_calc[i] - b[i][i] * v[i] * v[i]
            } else {
                let angle_diff = theta[i] - theta[jj];
                v[i] * v[jj] * (g[i][jj] * angle_diff.sin() - b[i][jj] * angle_diff.cos())
            };
        }
    }

    // J2: dP/dV
    for (ki, &i) in non_slack.iter().enumerate() {
        for (kj, &jj) in pq_set.iter().enumerate() {
            j[ki][n_p + kj] = if i == jj {
                p_calc[i] / v[i] + g[i][i] * v[i]
            } else {
                let angle_diff = theta[i] - theta[jj];
                v[i] * (g[i][jj] * angle_diff.cos() + b[i][jj] * angle_diff.sin())
            };
        }
    }

    // J3: dQ/dTheta
    for (ki, &i) in pq_set.iter().enumerate() {
        for (kj, &jj) in non_slack.iter().enumerate() {
            j[n_p + ki][kj] = if i == jj {
                p_calc[i] - g[i][i] * v[i] * v[i]
            } else {
                let angle_diff = theta[i] - theta[jj];
                -v[i] * v[jj] * (g[i][jj] * angle_diff.cos() + b[i][jj] * angle_diff.sin())
            };
        }
    }

    // J4: dQ/dV
    for (ki, &i) in pq_set.iter().enumerate() {
        for (kj, &jj) in pq_set.iter().enumerate() {
            j[n_p + ki][n_p + kj] = if i == jj {
                q_calc[i] / v[i] - b[i][i] * v[i]
            } else {
                let angle_diff = theta[i] - theta[jj];
                v[i] * (g[i][jj] * angle_diff.sin() - b[i][jj] * angle_diff.cos())
            };
        }
    }

    j
}

/// Solves `A x = b` via faer's dense partial-pivot LU. Returns `None` if
/// the factorization produced a non-finite solution (singular Jacobian).
fn solve_dense(a: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    if n == 0 {
        return Some(vec![]);
    }
    let mut mat = Mat::zeros(n, n);
    for i in 0..n {
        for jcol in 0..n {
            mat.write(i, jcol, a[i][jcol]);
        }
    }
    let mut b = Mat::zeros(n, 1);
    for i in 0..n {
        b.write(i, 0, rhs[i]);
    }

    let lu = mat.partial_piv_lu();
    let solution = lu.solve(&b);
    let x: Vec<f64> = (0..n).map(|i| solution.read(i, 0)).collect();

    if x.iter().any(|v| !v.is_finite()) {
        None
    } else {
        Some(x)
    }
}

fn build_result(
    network: &NetworkModel,
    v: &[f64],
    theta: &[f64],
    converged: bool,
    iterations: usize,
    max_mismatch: f64,
) -> PowerFlowResult {
    let y_bus = network.build_y_bus();
    let n = network.buses.len();
    let v_complex: Vec<num_complex::Complex64> = v
        .iter()
        .zip(theta.iter())
        .map(|(&mag, &ang)| num_complex::Complex64::from_polar(mag, ang))
        .collect();

    let mut p_inject = vec![0.0; n];
    let mut q_inject = vec![0.0; n];
    for i in 0..n {
        let mut i_bus = num_complex::Complex64::new(0.0, 0.0);
        for jcol in 0..n {
            i_bus += y_bus[i][jcol] * v_complex[jcol];
        }
        let s_bus = v_complex[i] * i_bus.conj();
        p_inject[i] = s_bus.re;
        q_inject[i] = s_bus.im;
    }

    PowerFlowResult {
        converged,
        iterations,
        max_mismatch,
        voltage_pu: v.to_vec(),
        voltage_angle_rad: theta.to_vec(),
        p_inject_pu: p_inject,
        q_inject_pu: q_inject,
        branch_flows: build_branch_flows(network, v, theta),
    }
}
