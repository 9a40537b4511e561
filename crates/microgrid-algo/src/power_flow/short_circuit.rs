//! IEC 60909 simplified three-phase short-circuit analysis.
//!
//! For each bus `k`: augment the Y-bus with source admittance at fault-current
//! sources (grid slack, or any bus carrying a configured `sc_mva`), invert to
//! get the bus impedance matrix `Z_bus`, then `I_sc_k = V_pre / |Z_bus[k,k]|`.

use faer::prelude::SpSolver;
use faer::Mat;
use num_complex::Complex64;

use microgrid_core::network::{BusType, NetworkModel};
use microgrid_core::units::{Kiloamperes, MegavoltAmperes};

/// Short-circuit result at a single bus.
#[derive(Debug, Clone, Copy)]
pub struct BusShortCircuitResult {
    pub bus_index: usize,
    pub i_sc_ka: Kiloamperes,
    pub s_sc_mva: MegavoltAmperes,
    pub z_th_pu: Complex64,
}

/// Short-circuit results for every bus in the network.
#[derive(Debug, Clone)]
pub struct ShortCircuitResult {
    pub bus_results: Vec<BusShortCircuitResult>,
}

impl ShortCircuitResult {
    pub fn at(&self, bus_index: usize) -> Option<&BusShortCircuitResult> {
        self.bus_results.iter().find(|r| r.bus_index == bus_index)
    }

    pub fn worst_case_mva(&self) -> Option<&BusShortCircuitResult> {
        self.bus_results
            .iter()
            .max_by(|a, b| a.s_sc_mva.value().partial_cmp(&b.s_sc_mva.value()).unwrap())
    }
}

/// Base current in kA: `I_base = S_base / (√3 · V_base)`.
pub fn i_base_ka(v_base_kv: f64, s_base_mva: f64) -> f64 {
    s_base_mva / (3.0_f64.sqrt() * v_base_kv)
}

/// Computes three-phase fault current/power at every bus, assuming a
/// pre-fault voltage of `v_pre_pu` (1.0 nominal, sometimes 1.1 per IEC 60909
/// for the "maximum" fault-level case).
pub fn calculate(network: &NetworkModel, v_pre_pu: f64) -> ShortCircuitResult {
    let n = network.buses.len();
    if n == 0 {
        return ShortCircuitResult { bus_results: vec![] };
    }

    let mut y_bus = network.build_y_bus();

    for bus in &network.buses {
        if let Some(sc_mva) = bus.sc_mva.filter(|s| s.value() > 0.0) {
            // Grid source: Z_src = V²·S_base/S_sc, split R/X at an X/R of 10.
            let z_src_pu = v_pre_pu.powi(2) * network.s_base_mva / sc_mva.value();
            let x_src = z_src_pu * 10.0 / 101.0_f64.sqrt();
            let r_src = x_src / 10.0;
            y_bus[bus.index][bus.index] += 1.0 / Complex64::new(r_src, x_src);
        } else if bus.bus_type == BusType::Slack {
            // No configured fault level: assume a stiff infinite bus.
            y_bus[bus.index][bus.index] += 1.0 / Complex64::new(0.001, 0.01);
        }
    }

    let z_bus = match invert(&y_bus) {
        Some(z) => z,
        None => {
            return ShortCircuitResult {
                bus_results: network
                    .buses
                    .iter()
                    .map(|bus| BusShortCircuitResult {
                        bus_index: bus.index,
                        i_sc_ka: Kiloamperes(0.0),
                        s_sc_mva: MegavoltAmperes(0.0),
                        z_th_pu: Complex64::new(0.0, 0.0),
                    })
                    .collect(),
            };
        }
    };

    let bus_results = network
        .buses
        .iter()
        .map(|bus| {
            let k = bus.index;
            let z_th = z_bus[k][k];
            let i_sc_pu = if z_th.norm() < 1e-15 { 0.0 } else { v_pre_pu / z_th.norm() };

            let i_sc_ka = i_sc_pu * i_base_ka(bus.nominal_kv.value(), network.s_base_mva);
            let s_sc_mva = 3.0_f64.sqrt() * bus.nominal_kv.value() * i_sc_ka;

            BusShortCircuitResult {
                bus_index: k,
                i_sc_ka: Kiloamperes(i_sc_ka),
                s_sc_mva: MegavoltAmperes(s_sc_mva),
                z_th_pu: z_th,
            }
        })
        .collect();

    ShortCircuitResult { bus_results }
}

/// Dense matrix inverse via faer's partial-pivot LU solved against the
/// identity; returns `None` on a singular Y-bus.
fn invert(y: &[Vec<Complex64>]) -> Option<Vec<Vec<Complex64>>> {
    let n = y.len();

    // faer's dense solver here is real-valued; solve the real and imaginary
    // parts of the augmented 2n×2n real system that represents complex
    // multiplication, since faer::Mat<Complex64> LU is not exposed in this
    // version of the crate.
    let mut real = Mat::zeros(2 * n, 2 * n);
    for i in 0..n {
        for j in 0..n {
            let z = y[i][j];
            real.write(i, j, z.re);
            real.write(i, j + n, -z.im);
            real.write(i + n, j, z.im);
            real.write(i + n, j + n, z.re);
        }
    }

    let mut identity = Mat::zeros(2 * n, 2 * n);
    for i in 0..2 * n {
        identity.write(i, i, 1.0);
    }

    let lu = real.partial_piv_lu();
    let solved = lu.solve(&identity);

    let mut z_bus = vec![vec![Complex64::new(0.0, 0.0); n]; n];
    for i in 0..n {
        for j in 0..n {
            let re = solved.read(i, j);
            let im = solved.read(i + n, j);
            if !re.is_finite() || !im.is_finite() {
                return None;
            }
            z_bus[i][j] = Complex64::new(re, im);
        }
    }
    Some(z_bus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use microgrid_core::network::{Branch, BranchType, Bus};
    use microgrid_core::units::{Kilovolts, PerUnit};

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
    fn fault_current_is_positive_at_every_bus() {
        let net = two_bus_network();
        let result = calculate(&net, 1.0);
        assert_eq!(result.bus_results.len(), 2);
        assert!(result.bus_results.iter().all(|r| r.i_sc_ka.value() > 0.0));
    }

    #[test]
    fn remote_bus_has_lower_fault_level_than_the_source() {
        let net = two_bus_network();
        let result = calculate(&net, 1.0);
        let at_source = result.at(0).unwrap().s_sc_mva.value();
        let at_load = result.at(1).unwrap().s_sc_mva.value();
        assert!(at_load < at_source);
    }

    #[test]
    fn empty_network_returns_no_results() {
        let net = NetworkModel { buses: vec![], branches: vec![], s_base_mva: 1.0 };
        let result = calculate(&net, 1.0);
        assert!(result.bus_results.is_empty());
    }
}
