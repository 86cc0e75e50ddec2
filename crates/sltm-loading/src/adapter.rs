//! Bridge between loading buffers and a node model.

use crate::node_model::{NodeModel, NodeModelError, NodeModelInput};
use crate::splitting::SplittingRateStore;
use nalgebra::{DMatrix, DVector};
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::{Network, Node};
use tracing::warn;

/// Accepted flows at one node for one node-model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModelSolution {
    pub node: NodeId,
    pub entries: Vec<LinkSegmentId>,
    pub exits: Vec<LinkSegmentId>,
    /// Acceptance factor per entry.
    pub acceptance: DVector<Real>,
    /// `acceptance_i * S_ij`, entries × exits.
    pub accepted_turn_flows: DMatrix<Real>,
}

impl NodeModelSolution {
    /// Accepted outflow of an entry segment (pcu/h).
    pub fn entry_outflow(&self, entry: usize) -> Real {
        self.accepted_turn_flows.row(entry).sum()
    }

    /// Accepted inflow into an exit segment (pcu/h).
    pub fn exit_inflow(&self, exit: usize) -> Real {
        self.accepted_turn_flows.column(exit).sum()
    }
}

/// Builds node-model inputs from the current loading state and runs the model.
pub struct NodeModelAdapter<'a> {
    network: &'a Network,
    node_model: &'a dyn NodeModel,
    max_in_capacity: Real,
}

impl<'a> NodeModelAdapter<'a> {
    pub fn new(network: &'a Network, node_model: &'a dyn NodeModel) -> Self {
        Self {
            network,
            node_model,
            max_in_capacity: network.max_in_capacity(),
        }
    }

    /// Assemble the node-model input for `node`.
    ///
    /// Turn sending flows are `S_a * phi_ab`. Entry capacities are capped at
    /// the larger of the network's largest physical capacity and the node's
    /// total exit receiving flow: connectors then no longer swamp merge
    /// priorities, yet the cap can never bind below what the exits absorb.
    pub fn input(
        &self,
        node: &Node,
        sending: &[Real],
        receiving: &[Real],
        store: &dyn SplittingRateStore,
    ) -> Result<NodeModelInput, NodeModelError> {
        let entries = node.entry_segments();
        let exits = node.exit_segments();

        let mut turns = DMatrix::zeros(entries.len(), exits.len());
        for (i, &entry) in entries.iter().enumerate() {
            let rates = store
                .splitting_rates(entry)
                .ok_or_else(|| NodeModelError::Failed {
                    node: node.id,
                    message: format!("no splitting rates for entry segment {entry}"),
                })?;
            if rates.len() != exits.len() {
                return Err(NodeModelError::DimensionMismatch {
                    what: format!(
                        "entry segment {entry} has {} splitting rates, node has {} exits",
                        rates.len(),
                        exits.len()
                    ),
                });
            }
            let s = sending.get(entry.idx()).copied().unwrap_or(0.0);
            for (j, rate) in rates.iter().enumerate() {
                turns[(i, j)] = s * rate;
            }
        }

        let exit_receiving_flows = DVector::from_iterator(
            exits.len(),
            exits
                .iter()
                .map(|&e| receiving.get(e.idx()).copied().unwrap_or(0.0)),
        );
        let cap = self.max_in_capacity.max(exit_receiving_flows.sum());
        let entry_capacities = DVector::from_iterator(
            entries.len(),
            entries
                .iter()
                .map(|&e| self.network.capacity_pcu_h(e).min(cap)),
        );

        Ok(NodeModelInput {
            node: node.id,
            entry_capacities,
            turn_sending_flows: turns,
            exit_receiving_flows,
        })
    }

    /// Run the node model at `node`.
    ///
    /// Failures are logged and reported as `None`; the caller skips the node
    /// for this iteration.
    pub fn solve(
        &self,
        node: &Node,
        sending: &[Real],
        receiving: &[Real],
        store: &dyn SplittingRateStore,
    ) -> Option<NodeModelSolution> {
        let result = self
            .input(node, sending, receiving, store)
            .and_then(|input| {
                let acceptance = self.node_model.solve(&input)?;
                if acceptance.len() != input.entry_count() {
                    return Err(NodeModelError::DimensionMismatch {
                        what: format!(
                            "{} returned {} factors for {} entries",
                            self.node_model.name(),
                            acceptance.len(),
                            input.entry_count()
                        ),
                    });
                }
                Ok((input, acceptance))
            });

        match result {
            Ok((input, acceptance)) => {
                let mut accepted = input.turn_sending_flows;
                for (i, a) in acceptance.iter().enumerate() {
                    accepted.row_mut(i).scale_mut(*a);
                }
                Some(NodeModelSolution {
                    node: node.id,
                    entries: node.entry_segments().to_vec(),
                    exits: node.exit_segments().to_vec(),
                    acceptance,
                    accepted_turn_flows: accepted,
                })
            }
            Err(err) => {
                warn!(node = %node.id, model = self.node_model.name(), error = %err,
                    "node model failed, node skipped this iteration");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_model::TampereNodeModel;
    use crate::splitting::{PartialSplittingRates, SplittingRateStore};
    use sltm_core::{km, pcu_per_hour};
    use sltm_network::NetworkBuilder;

    #[test]
    fn merge_solution_respects_exit_receiving_flow() {
        let mut b = NetworkBuilder::new();
        let a = b.add_node("A");
        let c = b.add_node("C");
        let m = b.add_node("M");
        let d = b.add_node("D");
        let am = b.add_link_segment("A-M", a, m, pcu_per_hour(2000.0), km(1.0));
        let cm = b.add_link_segment("C-M", c, m, pcu_per_hour(2000.0), km(1.0));
        let md = b.add_link_segment("M-D", m, d, pcu_per_hour(2000.0), km(1.0));
        let network = b.build().unwrap();

        let mut store = PartialSplittingRates::new(network.node_count());
        store.register_potentially_blocking_node(network.node(m).unwrap());
        store.splitting_rates_mut(am).unwrap()[0] = 1.0;
        store.splitting_rates_mut(cm).unwrap()[0] = 1.0;

        let mut sending = vec![0.0; 3];
        sending[am.idx()] = 1500.0;
        sending[cm.idx()] = 1500.0;
        let receiving = network.capacities();

        let model = TampereNodeModel;
        let adapter = NodeModelAdapter::new(&network, &model);
        let solution = adapter
            .solve(network.node(m).unwrap(), &sending, &receiving, &store)
            .unwrap();
        assert!((solution.exit_inflow(0) - 2000.0).abs() < 1e-6);
        assert!((solution.entry_outflow(0) - 1000.0).abs() < 1e-6);
        assert_eq!(solution.exits, vec![md]);
    }

    #[test]
    fn connector_entry_cap_never_binds_below_exit_supply() {
        let mut b = NetworkBuilder::new();
        let o = b.add_centroid("O");
        let a = b.add_node("A");
        let x = b.add_node("X");
        let y = b.add_node("Y");
        let oa = b.add_connector("O-A", o, a);
        b.add_link_segment("A-X", a, x, pcu_per_hour(2000.0), km(1.0));
        b.add_link_segment("A-Y", a, y, pcu_per_hour(1400.0), km(1.0));
        let network = b.build().unwrap();

        let mut store = PartialSplittingRates::new(network.node_count());
        store.register_potentially_blocking_node(network.node(a).unwrap());
        store
            .splitting_rates_mut(oa)
            .unwrap()
            .copy_from_slice(&[0.5, 0.5]);
        let mut sending = vec![0.0; 3];
        sending[oa.idx()] = 3000.0;
        let receiving = network.capacities();

        let model = TampereNodeModel;
        let adapter = NodeModelAdapter::new(&network, &model);
        let input = adapter
            .input(network.node(a).unwrap(), &sending, &receiving, &store)
            .unwrap();
        assert!((input.entry_capacities[0] - 3400.0).abs() < 1e-6);

        let solution = adapter
            .solve(network.node(a).unwrap(), &sending, &receiving, &store)
            .unwrap();
        assert!((solution.acceptance[0] - 1400.0 / 1500.0).abs() < 1e-6);
        assert!((solution.exit_inflow(0) - 1400.0).abs() < 1e-6);
        assert!((solution.exit_inflow(1) - 1400.0).abs() < 1e-6);
    }

    #[test]
    fn untracked_node_is_skipped() {
        let mut b = NetworkBuilder::new();
        let a = b.add_node("A");
        let m = b.add_node("M");
        b.add_link_segment("A-M", a, m, pcu_per_hour(2000.0), km(1.0));
        let network = b.build().unwrap();
        let store = PartialSplittingRates::new(network.node_count());
        let model = TampereNodeModel;
        let adapter = NodeModelAdapter::new(&network, &model);
        assert!(
            adapter
                .solve(network.node(m).unwrap(), &[100.0], &[2000.0], &store)
                .is_none()
        );
    }
}
