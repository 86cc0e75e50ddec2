//! General first-order node model with capacity-proportional priorities.

use super::{NodeModel, NodeModelInput, NodeModelResult};
use nalgebra::DVector;
use sltm_core::Real;

/// Entries are served in proportion to their capacity. Each round the most
/// restrictive exit (smallest supply per unit of oriented capacity) is
/// resolved: entries whose demand fits under that ratio are released
/// unconstrained, otherwise every entry competing for the exit is throttled
/// to the ratio and frozen.
#[derive(Debug, Clone, Copy, Default)]
pub struct TampereNodeModel;

impl TampereNodeModel {
    pub fn new() -> Self {
        Self
    }
}

impl NodeModel for TampereNodeModel {
    fn name(&self) -> &str {
        "tampere"
    }

    fn solve(&self, input: &NodeModelInput) -> NodeModelResult<DVector<Real>> {
        input.check()?;
        let entries = input.entry_count();
        let exits = input.exit_count();

        // Entry demand above capacity never reaches the node.
        let mut capped = input.turn_sending_flows.clone();
        let mut scale = DVector::from_element(entries, 1.0);
        let mut demand = DVector::zeros(entries);
        for i in 0..entries {
            let sending = input.entry_sending_flow(i);
            let capacity = input.entry_capacities[i];
            if sending > capacity && sending > 0.0 {
                scale[i] = capacity / sending;
                capped.row_mut(i).scale_mut(scale[i]);
            }
            demand[i] = capped.row(i).sum();
        }

        let mut alpha = DVector::from_element(entries, 1.0);
        let mut undetermined: Vec<bool> = (0..entries).map(|i| demand[i] > 0.0).collect();
        let mut supply = input.exit_receiving_flows.clone();

        while undetermined.iter().any(|u| *u) {
            // Most restrictive exit among those still receiving undetermined flow.
            let mut most_restrictive: Option<(usize, Real)> = None;
            for j in 0..exits {
                let oriented: Real = (0..entries)
                    .filter(|&i| undetermined[i])
                    .map(|i| input.entry_capacities[i] * capped[(i, j)] / demand[i])
                    .sum();
                if oriented <= 0.0 {
                    continue;
                }
                let ratio = supply[j].max(0.0) / oriented;
                if most_restrictive.is_none_or(|(_, best)| ratio < best) {
                    most_restrictive = Some((j, ratio));
                }
            }
            let Some((j_star, ratio)) = most_restrictive else {
                break;
            };

            let demand_constrained: Vec<usize> = (0..entries)
                .filter(|&i| {
                    undetermined[i]
                        && capped[(i, j_star)] > 0.0
                        && demand[i] <= ratio * input.entry_capacities[i]
                })
                .collect();

            if !demand_constrained.is_empty() {
                for i in demand_constrained {
                    alpha[i] = 1.0;
                    for j in 0..exits {
                        supply[j] -= capped[(i, j)];
                    }
                    undetermined[i] = false;
                }
                continue;
            }

            for i in 0..entries {
                if !undetermined[i] || capped[(i, j_star)] <= 0.0 {
                    continue;
                }
                alpha[i] = ratio * input.entry_capacities[i] / demand[i];
                for j in 0..exits {
                    supply[j] -= alpha[i] * capped[(i, j)];
                }
                undetermined[i] = false;
            }
        }

        Ok(alpha.zip_map(&scale, |a, s| (a * s).clamp(0.0, 1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_model::NodeModelError;
    use nalgebra::{DMatrix, dvector};
    use proptest::prelude::*;
    use sltm_core::{NodeId, Tolerances, nearly_equal};

    fn input(caps: Vec<Real>, turns: DMatrix<Real>, receiving: Vec<Real>) -> NodeModelInput {
        NodeModelInput {
            node: NodeId::from_index(0),
            entry_capacities: DVector::from_vec(caps),
            turn_sending_flows: turns,
            exit_receiving_flows: DVector::from_vec(receiving),
        }
    }

    #[test]
    fn uncongested_node_accepts_everything() {
        let inp = input(
            vec![2000.0],
            DMatrix::from_row_slice(1, 2, &[300.0, 400.0]),
            vec![1000.0, 1000.0],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        assert_eq!(alpha, dvector![1.0]);
    }

    #[test]
    fn symmetric_merge_splits_supply_evenly() {
        let inp = input(
            vec![2000.0, 2000.0],
            DMatrix::from_row_slice(2, 1, &[1500.0, 1500.0]),
            vec![2000.0],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        let tol = Tolerances::default();
        assert!(nearly_equal(alpha[0], 1000.0 / 1500.0, tol));
        assert!(nearly_equal(alpha[1], 1000.0 / 1500.0, tol));
    }

    #[test]
    fn small_entry_is_released_unconstrained() {
        let inp = input(
            vec![2000.0, 2000.0],
            DMatrix::from_row_slice(2, 1, &[1800.0, 200.0]),
            vec![1500.0],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        let tol = Tolerances::default();
        assert!(nearly_equal(alpha[1], 1.0, tol));
        assert!(nearly_equal(alpha[0], 1300.0 / 1800.0, tol));
    }

    #[test]
    fn fifo_diverge_blocks_whole_entry() {
        // Half the demand wants a 250 pcu/h exit; the other exit is free.
        let inp = input(
            vec![2000.0],
            DMatrix::from_row_slice(1, 2, &[500.0, 500.0]),
            vec![250.0, 5000.0],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        assert!(nearly_equal(alpha[0], 0.5, Tolerances::default()));
    }

    #[test]
    fn entry_capacity_caps_discharge() {
        let inp = input(
            vec![1000.0],
            DMatrix::from_row_slice(1, 1, &[1500.0]),
            vec![1.0e7],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        assert!(nearly_equal(alpha[0], 2.0 / 3.0, Tolerances::default()));
    }

    #[test]
    fn zero_demand_entry_keeps_neutral_factor() {
        let inp = input(
            vec![1000.0, 1000.0],
            DMatrix::from_row_slice(2, 1, &[0.0, 800.0]),
            vec![400.0],
        );
        let alpha = TampereNodeModel.solve(&inp).unwrap();
        assert_eq!(alpha[0], 1.0);
        assert!(nearly_equal(alpha[1], 0.5, Tolerances::default()));
    }

    #[test]
    fn rejects_bad_dimensions_and_values() {
        let bad_dims = input(vec![1000.0], DMatrix::zeros(2, 1), vec![100.0]);
        assert!(matches!(
            TampereNodeModel.solve(&bad_dims),
            Err(NodeModelError::DimensionMismatch { .. })
        ));
        let negative = input(
            vec![1000.0],
            DMatrix::from_row_slice(1, 1, &[-1.0]),
            vec![100.0],
        );
        assert!(matches!(
            TampereNodeModel.solve(&negative),
            Err(NodeModelError::InvalidInput { .. })
        ));
    }

    fn node_case() -> impl Strategy<Value = NodeModelInput> {
        (1usize..4, 1usize..4).prop_flat_map(|(n, m)| {
            (
                prop::collection::vec(100.0..3000.0f64, n),
                prop::collection::vec(0.0..3000.0f64, n * m),
                prop::collection::vec(0.0..3000.0f64, m),
            )
                .prop_map(move |(caps, turns, receiving)| {
                    input(caps, DMatrix::from_row_slice(n, m, &turns), receiving)
                })
        })
    }

    proptest! {
        #[test]
        fn respects_receiving_flows_and_capacities(inp in node_case()) {
            let alpha = TampereNodeModel.solve(&inp).unwrap();
            let slack = 1e-6;
            for i in 0..inp.entry_count() {
                prop_assert!((0.0..=1.0).contains(&alpha[i]));
                let discharged = alpha[i] * inp.entry_sending_flow(i);
                prop_assert!(discharged <= inp.entry_capacities[i] + slack);
            }
            for j in 0..inp.exit_count() {
                let accepted: Real = (0..inp.entry_count())
                    .map(|i| alpha[i] * inp.turn_sending_flows[(i, j)])
                    .sum();
                prop_assert!(accepted <= inp.exit_receiving_flows[j] + slack);
            }
        }
    }
}
