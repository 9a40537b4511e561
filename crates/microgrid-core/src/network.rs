//! Flat, index-based network topology.
//!
//! Per [§9 DESIGN NOTES], the network is represented as indexed arrays
//! (`buses: Vec<Bus>`, `branches: Vec<Branch>` with integer `from`/`to`)
//! rather than an owned graph structure. Adjacency is built lazily from the
//! branch list, which removes ownership cycles entirely and makes the
//! contingency screener's "network minus one branch" operation a cheap
//! filter-and-reindex instead of a graph mutation.
//!
//! Grounded on the original `NetworkModel`/`BusData`/`BranchData` shapes and
//! their `build_y_bus` accumulation order.

use std::collections::VecDeque;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::units::{ImpedancePu, Kilovolts, MegavoltAmperes, PerUnit};

/// A bus's role in the power-flow formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// Angle and voltage magnitude reference; absorbs the system's power balance.
    Slack,
    /// Voltage magnitude held at setpoint; reactive power is solved for.
    Pv,
    /// Both active and reactive power specified; voltage is solved for.
    Pq,
}

/// One bus in the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub index: usize,
    pub name: String,
    pub bus_type: BusType,
    pub nominal_kv: Kilovolts,
    pub v_setpoint_pu: PerUnit,
    pub v_min_pu: PerUnit,
    pub v_max_pu: PerUnit,
    pub p_gen_pu: f64,
    pub q_gen_pu: f64,
    pub p_load_pu: f64,
    pub q_load_pu: f64,
    /// Short-circuit source capacity in MVA, if this bus is a fault-current source.
    pub sc_mva: Option<MegavoltAmperes>,
}

impl Bus {
    pub fn net_p_pu(&self) -> f64 {
        self.p_gen_pu - self.p_load_pu
    }

    pub fn net_q_pu(&self) -> f64 {
        self.q_gen_pu - self.q_load_pu
    }
}

/// The electrical role a branch plays, which decides how its impedance was
/// derived from nameplate parameters upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchType {
    Cable,
    Line,
    Transformer,
    Inverter,
}

/// One branch (cable, line, transformer, or inverter interface) in the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub from: usize,
    pub to: usize,
    pub branch_type: BranchType,
    pub z_pu: Complex64,
    pub shunt_b_pu: f64,
    /// Complex tap ratio; `1+0i` for untapped branches.
    pub tap_ratio: Complex64,
    pub thermal_rating_mva: MegavoltAmperes,
}

impl Branch {
    pub fn y_series(&self) -> Complex64 {
        1.0 / self.z_pu
    }
}

/// The static network topology: buses, branches, and the system MVA base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    pub buses: Vec<Bus>,
    pub branches: Vec<Branch>,
    pub s_base_mva: f64,
}

impl NetworkModel {
    pub fn validate(&self) -> CoreResult<()> {
        if self.buses.is_empty() {
            return Err(CoreError::config("buses", "network must have at least one bus"));
        }
        if self.s_base_mva <= 0.0 {
            return Err(CoreError::config("s_base_mva", "must be positive"));
        }
        let slack_count = self.buses.iter().filter(|b| b.bus_type == BusType::Slack).count();
        if slack_count != 1 {
            return Err(CoreError::config(
                "buses",
                format!("network must have exactly one slack bus, found {slack_count}"),
            ));
        }
        for (i, bus) in self.buses.iter().enumerate() {
            if bus.index != i {
                return Err(CoreError::Network(format!(
                    "bus at position {i} has index {}, buses must be densely indexed",
                    bus.index
                )));
            }
        }
        for branch in &self.branches {
            if branch.from >= self.buses.len() || branch.to >= self.buses.len() {
                return Err(CoreError::Network(format!(
                    "branch {}->{} references a bus index out of range",
                    branch.from, branch.to
                )));
            }
        }
        Ok(())
    }

    pub fn slack_index(&self) -> usize {
        self.buses
            .iter()
            .position(|b| b.bus_type == BusType::Slack)
            .expect("validated network has exactly one slack bus")
    }

    /// Builds the bus admittance matrix in dense row-major form.
    ///
    /// Accumulation order follows the original per-branch loop: series
    /// admittance and half the shunt susceptance onto each end's diagonal,
    /// tap-adjusted mutual terms onto the off-diagonals.
    pub fn build_y_bus(&self) -> Vec<Vec<Complex64>> {
        let n = self.buses.len();
        let mut y = vec![vec![Complex64::new(0.0, 0.0); n]; n];
        for branch in &self.branches {
            let y_series = branch.y_series();
            let b_shunt = Complex64::new(0.0, branch.shunt_b_pu / 2.0);
            let t = branch.tap_ratio;
            let t_mag2 = t.norm_sqr();
            let i = branch.from;
            let j = branch.to;
            y[i][i] += y_series / t_mag2 + b_shunt;
            y[j][j] += y_series + b_shunt;
            y[i][j] -= y_series / t.conj();
            y[j][i] -= y_series / t;
        }
        y
    }

    /// Adjacency list built lazily from the branch list: `adjacency()[i]` is
    /// every `(neighbor, branch_index)` pair touching bus `i`.
    pub fn adjacency(&self) -> Vec<Vec<(usize, usize)>> {
        let mut adj = vec![Vec::new(); self.buses.len()];
        for (bi, branch) in self.branches.iter().enumerate() {
            adj[branch.from].push((branch.to, bi));
            adj[branch.to].push((branch.from, bi));
        }
        adj
    }

    /// Returns a copy of this network with the given branch removed and
    /// all surviving bus indices left untouched (only the branch list
    /// shrinks; buses never need reindexing since they're not what's removed).
    pub fn without_branch(&self, branch_index: usize) -> NetworkModel {
        let mut branches = self.branches.clone();
        branches.remove(branch_index);
        NetworkModel {
            buses: self.buses.clone(),
            branches,
            s_base_mva: self.s_base_mva,
        }
    }

    /// Breadth-first reachability from the slack bus. Any bus not reached is
    /// islanded by whatever branch removal produced this network.
    pub fn reachable_from_slack(&self) -> Vec<bool> {
        let adj = self.adjacency();
        let n = self.buses.len();
        let mut visited = vec![false; n];
        let start = self.slack_index();
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            for &(v, _) in &adj[u] {
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }
        visited
    }

    pub fn is_fully_connected(&self) -> bool {
        self.reachable_from_slack().iter().all(|&r| r)
    }

    /// Converts a branch impedance to its admittance in per-unit, clamping
    /// away from exact zero the same way [`ImpedancePu::to_admittance`] does.
    pub fn branch_impedance_pu(&self, branch_index: usize) -> ImpedancePu {
        ImpedancePu::new(self.branches[branch_index].z_pu.norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
                    p_load_pu: 0.5,
                    q_load_pu: 0.1,
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
    fn validates_single_slack() {
        assert!(two_bus_network().validate().is_ok());
    }

    #[test]
    fn rejects_zero_or_multiple_slacks() {
        let mut net = two_bus_network();
        net.buses[0].bus_type = BusType::Pq;
        assert!(net.validate().is_err());
    }

    #[test]
    fn y_bus_is_symmetric_for_untapped_branch() {
        let net = two_bus_network();
        let y = net.build_y_bus();
        assert!((y[0][1] - y[1][0]).norm() < 1e-12);
        assert!((y[0][0] + y[0][1]).norm() < 1e-9);
    }

    #[test]
    fn removing_the_only_branch_islands_the_load_bus() {
        let net = two_bus_network();
        let reduced = net.without_branch(0);
        let reachable = reduced.reachable_from_slack();
        assert!(reachable[0]);
        assert!(!reachable[1]);
        assert!(!reduced.is_fully_connected());
    }
}
