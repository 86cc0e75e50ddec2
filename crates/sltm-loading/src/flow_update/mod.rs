//! Flow propagation along a route-choice structure.
//!
//! The loading engine does not know whether demand travels along explicit
//! paths or origin bushes. It hands the current flow-acceptance factors to a
//! [`FlowUpdate`] and gets back turn flows, link inflows or link outflows.
//!
//! Propagation rule: flow entering segment `a` leaves it scaled by `alpha_a`;
//! the flow leaving `a` towards `b` is the turn flow `a -> b` and enters `b`.

mod bush;
mod path;

pub use bush::{BushFlowUpdate, OriginBush};
pub use path::{Path, PathFlowUpdate};

use crate::error::{LoadingError, LoadingResult};
use crate::splitting::SplittingRateStore;
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::Network;
use std::collections::HashMap;

/// What a flow update should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowUpdateMode {
    /// Turn flows at tracked nodes only.
    TurnFlows,
    /// Link inflows (sending flows before capacity limiting).
    SendingFlows,
    /// Link inflows and outflows.
    SendingAndOutflows,
}

/// Accepted turn flows keyed by (entry segment, exit segment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnFlows {
    flows: HashMap<(LinkSegmentId, LinkSegmentId), Real>,
}

impl TurnFlows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: LinkSegmentId, to: LinkSegmentId, flow: Real) {
        *self.flows.entry((from, to)).or_insert(0.0) += flow;
    }

    /// Turn flow (pcu/h), 0 when never recorded.
    pub fn get(&self, from: LinkSegmentId, to: LinkSegmentId) -> Real {
        self.flows.get(&(from, to)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkSegmentId, LinkSegmentId, Real)> + '_ {
        self.flows.iter().map(|(&(from, to), &q)| (from, to, q))
    }
}

/// Result of a flow update. Vectors not requested by the mode are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowUpdateOutput {
    pub turn_flows: TurnFlows,
    pub inflows: Vec<Real>,
    pub outflows: Vec<Real>,
}

/// Receives flow events while a route-choice structure is traversed.
pub trait FlowVisitor {
    fn link_inflow(&mut self, segment: LinkSegmentId, flow: Real);

    fn link_outflow(&mut self, segment: LinkSegmentId, flow: Real);

    /// Flow turning from `from` into `to` at `node`.
    fn turn(&mut self, node: NodeId, from: LinkSegmentId, to: LinkSegmentId, flow: Real);
}

/// A loading collaborator propagating demand through the network.
pub trait FlowUpdate: Send + Sync {
    fn name(&self) -> &str;

    /// Check the route-choice structure against `network`.
    fn validate(&self, network: &Network) -> LoadingResult<()>;

    /// Walk all demand through the network under `acceptance`, reporting every
    /// inflow, outflow and turn to `visitor`.
    fn traverse(
        &self,
        network: &Network,
        acceptance: &[Real],
        visitor: &mut dyn FlowVisitor,
    ) -> LoadingResult<()>;

    fn update(
        &self,
        network: &Network,
        acceptance: &[Real],
        store: &dyn SplittingRateStore,
        mode: FlowUpdateMode,
    ) -> LoadingResult<FlowUpdateOutput> {
        if acceptance.len() != network.link_segment_count() {
            return Err(LoadingError::InvalidState {
                what: format!(
                    "{} acceptance factors for {} link segments",
                    acceptance.len(),
                    network.link_segment_count()
                ),
            });
        }
        let mut collector = FlowCollector::new(network.link_segment_count(), store, mode);
        self.traverse(network, acceptance, &mut collector)?;
        Ok(collector.finish())
    }
}

/// Accumulates the flows requested by a [`FlowUpdateMode`].
struct FlowCollector<'a> {
    store: &'a dyn SplittingRateStore,
    mode: FlowUpdateMode,
    output: FlowUpdateOutput,
}

impl<'a> FlowCollector<'a> {
    fn new(segments: usize, store: &'a dyn SplittingRateStore, mode: FlowUpdateMode) -> Self {
        let mut output = FlowUpdateOutput::default();
        match mode {
            FlowUpdateMode::TurnFlows => {}
            FlowUpdateMode::SendingFlows => output.inflows = vec![0.0; segments],
            FlowUpdateMode::SendingAndOutflows => {
                output.inflows = vec![0.0; segments];
                output.outflows = vec![0.0; segments];
            }
        }
        Self {
            store,
            mode,
            output,
        }
    }

    fn finish(self) -> FlowUpdateOutput {
        self.output
    }
}

impl FlowVisitor for FlowCollector<'_> {
    fn link_inflow(&mut self, segment: LinkSegmentId, flow: Real) {
        if let Some(v) = self.output.inflows.get_mut(segment.idx()) {
            *v += flow;
        }
    }

    fn link_outflow(&mut self, segment: LinkSegmentId, flow: Real) {
        if let Some(v) = self.output.outflows.get_mut(segment.idx()) {
            *v += flow;
        }
    }

    fn turn(&mut self, node: NodeId, from: LinkSegmentId, to: LinkSegmentId, flow: Real) {
        if self.mode == FlowUpdateMode::TurnFlows && self.store.is_tracked(node) {
            self.output.turn_flows.add(from, to, flow);
        }
    }
}

/// The concrete route-choice structures the engine can load.
#[derive(Debug, Clone)]
pub enum FlowUpdateStrategy {
    Paths(PathFlowUpdate),
    Bushes(BushFlowUpdate),
}

impl From<PathFlowUpdate> for FlowUpdateStrategy {
    fn from(value: PathFlowUpdate) -> Self {
        Self::Paths(value)
    }
}

impl From<BushFlowUpdate> for FlowUpdateStrategy {
    fn from(value: BushFlowUpdate) -> Self {
        Self::Bushes(value)
    }
}

impl FlowUpdate for FlowUpdateStrategy {
    fn name(&self) -> &str {
        match self {
            Self::Paths(p) => p.name(),
            Self::Bushes(b) => b.name(),
        }
    }

    fn validate(&self, network: &Network) -> LoadingResult<()> {
        match self {
            Self::Paths(p) => p.validate(network),
            Self::Bushes(b) => b.validate(network),
        }
    }

    fn traverse(
        &self,
        network: &Network,
        acceptance: &[Real],
        visitor: &mut dyn FlowVisitor,
    ) -> LoadingResult<()> {
        match self {
            Self::Paths(p) => p.traverse(network, acceptance, visitor),
            Self::Bushes(b) => b.traverse(network, acceptance, visitor),
        }
    }
}
