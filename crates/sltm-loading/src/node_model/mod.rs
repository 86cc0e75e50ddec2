//! Node models: local resolution of merge/diverge conflicts at one node.

mod tampere;

pub use tampere::TampereNodeModel;

use nalgebra::{DMatrix, DVector};
use sltm_core::{NodeId, Real};
use thiserror::Error;

/// Everything a node model needs about one node.
///
/// Entries and exits follow the node's entry/exit segment order.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModelInput {
    pub node: NodeId,
    /// Entry capacities (pcu/h), one per entry segment.
    pub entry_capacities: DVector<Real>,
    /// Turn sending flows (pcu/h), entries × exits.
    pub turn_sending_flows: DMatrix<Real>,
    /// Receiving flows (pcu/h), one per exit segment.
    pub exit_receiving_flows: DVector<Real>,
}

impl NodeModelInput {
    pub fn entry_count(&self) -> usize {
        self.entry_capacities.len()
    }

    pub fn exit_count(&self) -> usize {
        self.exit_receiving_flows.len()
    }

    /// Total sending flow of an entry.
    pub fn entry_sending_flow(&self, entry: usize) -> Real {
        self.turn_sending_flows.row(entry).sum()
    }

    pub(crate) fn check(&self) -> NodeModelResult<()> {
        let (rows, cols) = self.turn_sending_flows.shape();
        if rows != self.entry_count() || cols != self.exit_count() {
            return Err(NodeModelError::DimensionMismatch {
                what: format!(
                    "turn sending flows are {rows}x{cols}, node has {} entries and {} exits",
                    self.entry_count(),
                    self.exit_count()
                ),
            });
        }
        let all_valid = self
            .entry_capacities
            .iter()
            .chain(self.turn_sending_flows.iter())
            .chain(self.exit_receiving_flows.iter())
            .all(|v| v.is_finite() && *v >= 0.0);
        if !all_valid {
            return Err(NodeModelError::InvalidInput {
                what: format!("negative or non-finite value at node {}", self.node),
            });
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeModelError {
    #[error("Dimension mismatch: {what}")]
    DimensionMismatch { what: String },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Node model failed at node {node}: {message}")]
    Failed { node: NodeId, message: String },
}

pub type NodeModelResult<T> = Result<T, NodeModelError>;

/// A first-order node model.
///
/// `solve` returns one acceptance factor per entry, each in `[0, 1]`, such that
/// accepted turn flows `alpha_i * S_ij` never exceed exit receiving flows and no
/// entry discharges more than its capacity.
pub trait NodeModel: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, input: &NodeModelInput) -> NodeModelResult<DVector<Real>>;
}
