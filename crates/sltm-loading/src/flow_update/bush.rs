//! Origin-based bush loading.

use super::{FlowUpdate, FlowVisitor};
use crate::error::{LoadingError, LoadingResult};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::Network;
use std::collections::BTreeMap;

const RATE_SUM_TOLERANCE: Real = 1e-6;

/// Acyclic set of link segments carrying the demand of one origin.
///
/// Demand leaves the origin through its root segments in fixed proportions;
/// at every node inside the bush, flow leaving a segment is divided over the
/// bush turns using their splitting rates. Segments without outgoing turns are
/// sinks (they end at a destination).
#[derive(Debug, Clone)]
pub struct OriginBush {
    origin: NodeId,
    demand_pcu_h: Real,
    root: Vec<(LinkSegmentId, Real)>,
    successors: BTreeMap<LinkSegmentId, Vec<(LinkSegmentId, Real)>>,
    order: Vec<LinkSegmentId>,
}

impl OriginBush {
    /// Build and check a bush. `turns` are `(from, to, rate)` triples.
    pub fn new(
        network: &Network,
        origin: NodeId,
        demand_pcu_h: Real,
        root: Vec<(LinkSegmentId, Real)>,
        turns: Vec<(LinkSegmentId, LinkSegmentId, Real)>,
    ) -> LoadingResult<Self> {
        if network.node(origin).is_none() {
            return Err(LoadingError::configuration(format!(
                "bush origin {origin} is not a node of the network"
            )));
        }
        if !demand_pcu_h.is_finite() || demand_pcu_h < 0.0 {
            return Err(LoadingError::configuration(format!(
                "bush of origin {origin} has invalid demand {demand_pcu_h}"
            )));
        }
        if root.is_empty() {
            return Err(LoadingError::configuration(format!(
                "bush of origin {origin} has no root segments"
            )));
        }

        let mut graph: DiGraphMap<LinkSegmentId, ()> = DiGraphMap::new();
        for &(segment, rate) in &root {
            let link = Self::segment(network, origin, segment)?;
            if link.upstream != origin {
                return Err(LoadingError::configuration(format!(
                    "root segment {segment} of bush {origin} does not leave the origin"
                )));
            }
            Self::check_rate(origin, rate)?;
            graph.add_node(segment);
        }
        Self::check_sum(origin, root.iter().map(|r| r.1), "root")?;

        let mut successors: BTreeMap<LinkSegmentId, Vec<(LinkSegmentId, Real)>> = BTreeMap::new();
        for &(from, to, rate) in &turns {
            let from_link = Self::segment(network, origin, from)?;
            let to_link = Self::segment(network, origin, to)?;
            if from_link.downstream != to_link.upstream {
                return Err(LoadingError::configuration(format!(
                    "bush {origin} turn {from} -> {to} does not share a node"
                )));
            }
            Self::check_rate(origin, rate)?;
            graph.add_edge(from, to, ());
            successors.entry(from).or_default().push((to, rate));
        }
        for (from, next) in &successors {
            Self::check_sum(origin, next.iter().map(|t| t.1), &format!("segment {from}"))?;
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            LoadingError::configuration(format!(
                "bush of origin {origin} has a cycle through link segment {}",
                cycle.node_id()
            ))
        })?;

        Ok(Self {
            origin,
            demand_pcu_h,
            root,
            successors,
            order,
        })
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn demand_pcu_h(&self) -> Real {
        self.demand_pcu_h
    }

    /// Bush segments in topological order.
    pub fn segments(&self) -> &[LinkSegmentId] {
        &self.order
    }

    fn segment(
        network: &Network,
        origin: NodeId,
        id: LinkSegmentId,
    ) -> LoadingResult<&sltm_network::LinkSegment> {
        network.link_segment(id).ok_or_else(|| {
            LoadingError::configuration(format!(
                "bush {origin} references unknown link segment {id}"
            ))
        })
    }

    fn check_rate(origin: NodeId, rate: Real) -> LoadingResult<()> {
        if rate.is_finite() && (0.0..=1.0).contains(&rate) {
            Ok(())
        } else {
            Err(LoadingError::configuration(format!(
                "bush {origin} has splitting rate {rate} outside [0, 1]"
            )))
        }
    }

    fn check_sum(origin: NodeId, rates: impl Iterator<Item = Real>, what: &str) -> LoadingResult<()> {
        let total: Real = rates.sum();
        if (total - 1.0).abs() > RATE_SUM_TOLERANCE {
            return Err(LoadingError::configuration(format!(
                "bush {origin} splitting rates of {what} sum to {total}, expected 1"
            )));
        }
        Ok(())
    }

    fn traverse(
        &self,
        network: &Network,
        acceptance: &[Real],
        visitor: &mut dyn FlowVisitor,
    ) -> LoadingResult<()> {
        let mut arriving: BTreeMap<LinkSegmentId, Real> = self
            .root
            .iter()
            .map(|&(segment, rate)| (segment, self.demand_pcu_h * rate))
            .collect();

        for &segment in &self.order {
            let inflow = arriving.get(&segment).copied().unwrap_or(0.0);
            visitor.link_inflow(segment, inflow);
            let alpha = acceptance.get(segment.idx()).copied().unwrap_or(1.0);
            let out = inflow * alpha;
            visitor.link_outflow(segment, out);

            let Some(next) = self.successors.get(&segment) else {
                continue;
            };
            let node = network
                .downstream_node(segment)
                .ok_or_else(|| {
                    LoadingError::configuration(format!(
                        "bush {} references unknown link segment {segment}",
                        self.origin
                    ))
                })?
                .id;
            for &(to, rate) in next {
                let q = out * rate;
                visitor.turn(node, segment, to, q);
                *arriving.entry(to).or_insert(0.0) += q;
            }
        }
        Ok(())
    }
}

/// Loads a set of origin bushes.
#[derive(Debug, Clone, Default)]
pub struct BushFlowUpdate {
    bushes: Vec<OriginBush>,
}

impl BushFlowUpdate {
    pub fn new(bushes: Vec<OriginBush>) -> Self {
        Self { bushes }
    }

    pub fn bushes(&self) -> &[OriginBush] {
        &self.bushes
    }
}

impl FlowUpdate for BushFlowUpdate {
    fn name(&self) -> &str {
        "bushes"
    }

    fn validate(&self, network: &Network) -> LoadingResult<()> {
        if self.bushes.is_empty() {
            return Err(LoadingError::configuration("no bushes to load"));
        }
        for bush in &self.bushes {
            if let Some(bad) = bush
                .order
                .iter()
                .find(|s| network.link_segment(**s).is_none())
            {
                return Err(LoadingError::configuration(format!(
                    "bush {} references unknown link segment {bad}",
                    bush.origin
                )));
            }
        }
        Ok(())
    }

    fn traverse(
        &self,
        network: &Network,
        acceptance: &[Real],
        visitor: &mut dyn FlowVisitor,
    ) -> LoadingResult<()> {
        self.bushes
            .iter()
            .try_for_each(|b| b.traverse(network, acceptance, visitor))
    }
}
