//! Linear DC power-flow approximation, used when Newton-Raphson fails to
//! converge. Assumes `|V| ≈ 1.0 pu`, `cos(θij) ≈ 1`, `sin(θij) ≈ θij`, and
//! neglects reactive power entirely: solves `B' · Δθ = P_spec` on the
//! non-slack buses.

use faer::prelude::SpSolver;
use faer::Mat;

use microgrid_core::network::{BusType, NetworkModel};

use super::{build_branch_flows, PowerFlowResult};

/// Solves the reduced `B'·θ = P` linear system. Always reports
/// `converged=true, iterations=1` since there is no mismatch loop to fail.
pub fn solve(network: &NetworkModel) -> PowerFlowResult {
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
    let b: Vec<Vec<f64>> = y_bus.iter().map(|row| row.iter().map(|c| c.im).collect()).collect();

    let slack_idx = network.slack_index();
    let non_slack: Vec<usize> = (0..n).filter(|&i| i != slack_idx).collect();
    let n_ns = non_slack.len();

    let p_spec: Vec<f64> = network.buses.iter().map(|bus| bus.net_p_pu()).collect();

    let mut theta = vec![0.0; n];
    if n_ns > 0 {
        let mut b_prime = Mat::zeros(n_ns, n_ns);
        let mut p_rhs = Mat::zeros(n_ns, 1);
        for (ki, &i) in non_slack.iter().enumerate() {
            p_rhs.write(ki, 0, p_spec[i]);
            for (kj, &j) in non_slack.iter().enumerate() {
                b_prime.write(ki, kj, -b[i][j]);
            }
        }

        let lu = b_prime.partial_piv_lu();
        let solution = lu.solve(&p_rhs);
        let theta_ns: Vec<f64> = (0..n_ns).map(|i| solution.read(i, 0)).collect();
        if theta_ns.iter().all(|v| v.is_finite()) {
            for (k, &i) in non_slack.iter().enumerate() {
                theta[i] = theta_ns[k];
            }
        }
    }

    let mut v = vec![1.0; n];
    for bus in &network.buses {
        if matches!(bus.bus_type, BusType::Slack | BusType::Pv) {
            v[bus.index] = bus.v_setpoint_pu.value();
        }
    }

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
        converged: true,
        iterations: 1,
        max_mismatch: 0.0,
        voltage_pu: v.clone(),
        voltage_angle_rad: theta.clone(),
        p_inject_pu: p_inject,
        q_inject_pu: q_inject,
        branch_flows: build_branch_flows(network, &v, &theta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microgrid_core::network::{Branch, BranchType, Bus};
    use microgrid_core::units::{Kilovolts, MegavoltAmperes, PerUnit};
    use num_complex::Complex64;

    fn two_bus_network() -> NetworkModel {
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
                    name: "load".into(),
                    bus_type: BusType::Pq,
                    nominal_kv: Kilovolts(11.0),
                    v_setpoint_pu: PerUnit(1.0),
                    v_min_pu: PerUnit(0.95),
                    v_max_pu: PerUnit(1.05),
                    p_gen_pu: 0.0,
                    q_gen_pu: 0.0,
                    p_load_pu: 0.2,
                    q_load_pu: 0.05,
                    sc_mva: None,
                },
            ],
            branches: vec![Branch {
                from: 0,
                to: 1,
                branch_type: BranchType::Cable,
                z_pu: Complex64::new(0.01, 0.05),
                shunt_b_pu: 0.0,
                tap_ratio: Complex64::new(1.0, 0.0),
                thermal_rating_mva: MegavoltAmperes(5.0),
            }],
            s_base_mva: 1.0,
        }
    }

    #[test]
    fn always_reports_converged_in_one_iteration() {
        let net = two_bus_network();
        let result = solve(&net);
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn voltage_magnitudes_are_flat_at_one() {
        let net = two_bus_network();
        let result = solve(&net);
        assert!(result.voltage_pu.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn load_bus_angle_lags_the_slack() {
        let net = two_bus_network();
        let result = solve(&net);
        assert!(result.voltage_angle_rad[1] < result.voltage_angle_rad[0]);
    }
}
