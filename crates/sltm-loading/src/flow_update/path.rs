//! Path-based loading.

use super::{FlowUpdate, FlowVisitor};
use crate::error::{LoadingError, LoadingResult};
use sltm_core::{LinkSegmentId, Real};
use sltm_network::Network;

/// A fixed route carrying a constant flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub name: String,
    pub segments: Vec<LinkSegmentId>,
    pub flow_pcu_h: Real,
}

impl Path {
    pub fn new(name: impl Into<String>, segments: Vec<LinkSegmentId>, flow_pcu_h: Real) -> Self {
        Self {
            name: name.into(),
            segments,
            flow_pcu_h,
        }
    }

    fn check(&self, network: &Network) -> LoadingResult<()> {
        if self.segments.is_empty() {
            return Err(LoadingError::configuration(format!(
                "path '{}' has no link segments",
                self.name
            )));
        }
        if !self.flow_pcu_h.is_finite() || self.flow_pcu_h < 0.0 {
            return Err(LoadingError::configuration(format!(
                "path '{}' has invalid flow {}",
                self.name, self.flow_pcu_h
            )));
        }
        let mut previous = None;
        for &id in &self.segments {
            let segment = network.link_segment(id).ok_or_else(|| {
                LoadingError::configuration(format!(
                    "path '{}' references unknown link segment {id}",
                    self.name
                ))
            })?;
            if previous.is_some_and(|prev| prev != segment.upstream) {
                return Err(LoadingError::configuration(format!(
                    "path '{}' is not contiguous at link segment {id}",
                    self.name
                )));
            }
            previous = Some(segment.downstream);
        }
        Ok(())
    }
}

/// Loads a set of paths.
#[derive(Debug, Clone, Default)]
pub struct PathFlowUpdate {
    paths: Vec<Path>,
}

impl PathFlowUpdate {
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }
}

impl FlowUpdate for PathFlowUpdate {
    fn name(&self) -> &str {
        "paths"
    }

    fn validate(&self, network: &Network) -> LoadingResult<()> {
        if self.paths.is_empty() {
            return Err(LoadingError::configuration("no paths to load"));
        }
        self.paths.iter().try_for_each(|p| p.check(network))
    }

    fn traverse(
        &self,
        network: &Network,
        acceptance: &[Real],
        visitor: &mut dyn FlowVisitor,
    ) -> LoadingResult<()> {
        for path in &self.paths {
            let mut flow = path.flow_pcu_h;
            for (k, &segment) in path.segments.iter().enumerate() {
                visitor.link_inflow(segment, flow);
                let alpha = acceptance.get(segment.idx()).copied().unwrap_or(1.0);
                let out = flow * alpha;
                visitor.link_outflow(segment, out);
                if let Some(&next) = path.segments.get(k + 1) {
                    let node = network.downstream_node(segment).ok_or_else(|| {
                        LoadingError::configuration(format!(
                            "path '{}' references unknown link segment {segment}",
                            path.name
                        ))
                    })?;
                    visitor.turn(node.id, segment, next, out);
                }
                flow = out;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_update::FlowUpdateMode;
    use crate::splitting::{PartialSplittingRates, SplittingRateStore};
    use sltm_core::{km, pcu_per_hour};
    use sltm_network::NetworkBuilder;

    fn corridor() -> (Network, Vec<LinkSegmentId>) {
        let mut b = NetworkBuilder::new();
        let o = b.add_centroid("O");
        let a = b.add_node("A");
        let c = b.add_node("B");
        let d = b.add_centroid("D");
        let s = vec![
            b.add_connector("O-A", o, a),
            b.add_link_segment("A-B", a, c, pcu_per_hour(1000.0), km(1.0)),
            b.add_connector("B-D", c, d),
        ];
        (b.build().unwrap(), s)
    }

    #[test]
    fn propagates_acceptance_downstream() {
        let (network, s) = corridor();
        let update = PathFlowUpdate::new(vec![Path::new("p", s.clone(), 1500.0)]);
        update.validate(&network).unwrap();

        let mut alpha = vec![1.0; 3];
        alpha[s[1].idx()] = 2.0 / 3.0;
        let store = PartialSplittingRates::new(network.node_count());
        let out = update
            .update(&network, &alpha, &store, FlowUpdateMode::SendingAndOutflows)
            .unwrap();
        assert_eq!(out.inflows[s[1].idx()], 1500.0);
        assert!((out.outflows[s[1].idx()] - 1000.0).abs() < 1e-9);
        assert!((out.inflows[s[2].idx()] - 1000.0).abs() < 1e-9);
        assert!(out.turn_flows.is_empty());
    }

    #[test]
    fn turn_flows_only_at_tracked_nodes() {
        let (network, s) = corridor();
        let update = PathFlowUpdate::new(vec![Path::new("p", s.clone(), 500.0)]);
        let mut store = PartialSplittingRates::new(network.node_count());
        let b = network.downstream_node(s[1]).unwrap();
        store.register_tracked_node(b);

        let out = update
            .update(&network, &[1.0; 3], &store, FlowUpdateMode::TurnFlows)
            .unwrap();
        assert_eq!(out.turn_flows.len(), 1);
        assert_eq!(out.turn_flows.get(s[1], s[2]), 500.0);
        assert!(out.inflows.is_empty());
    }

    #[test]
    fn rejects_broken_paths() {
        let (network, s) = corridor();
        let gap = PathFlowUpdate::new(vec![Path::new("gap", vec![s[0], s[2]], 10.0)]);
        assert!(matches!(
            gap.validate(&network),
            Err(LoadingError::Configuration { .. })
        ));
        let negative = PathFlowUpdate::new(vec![Path::new("neg", s, -1.0)]);
        assert!(negative.validate(&network).is_err());
        assert!(PathFlowUpdate::default().validate(&network).is_err());
    }
}
