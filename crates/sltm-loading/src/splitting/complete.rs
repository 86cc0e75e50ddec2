//! Dense splitting-rate store for fully tracked networks.

use super::SplittingRateStore;
use crate::scheme::TrackingScope;
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::Node;

/// Every activated node is tracked and potentially blocking. Rate vectors live
/// in a dense array indexed by entry segment id.
#[derive(Debug, Clone)]
pub struct CompleteSplittingRates {
    activated: Vec<bool>,
    rates: Vec<Option<Vec<Real>>>,
}

impl CompleteSplittingRates {
    pub fn new(node_count: usize, segment_count: usize) -> Self {
        Self {
            activated: vec![false; node_count],
            rates: vec![None; segment_count],
        }
    }

    fn activate(&mut self, node: &Node) -> bool {
        if node.centroid {
            return false;
        }
        let idx = node.id.idx();
        if idx >= self.activated.len() {
            self.activated.resize(idx + 1, false);
        }
        if self.activated[idx] {
            return false;
        }
        self.activated[idx] = true;
        let exits = node.exit_segments().len();
        for &entry in node.entry_segments() {
            if entry.idx() >= self.rates.len() {
                self.rates.resize(entry.idx() + 1, None);
            }
            self.rates[entry.idx()] = Some(vec![0.0; exits]);
        }
        true
    }

    fn activated_nodes(&self) -> Vec<NodeId> {
        self.activated
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(i, _)| NodeId::from_index(i as u32))
            .collect()
    }
}

impl SplittingRateStore for CompleteSplittingRates {
    fn tracking_scope(&self) -> TrackingScope {
        TrackingScope::Complete
    }

    fn is_tracked(&self, node: NodeId) -> bool {
        self.activated.get(node.idx()).copied().unwrap_or(false)
    }

    fn is_potentially_blocking(&self, node: NodeId) -> bool {
        self.is_tracked(node)
    }

    fn tracked_nodes(&self) -> Vec<NodeId> {
        self.activated_nodes()
    }

    fn potentially_blocking_nodes(&self) -> Vec<NodeId> {
        self.activated_nodes()
    }

    fn splitting_rates(&self, entry: LinkSegmentId) -> Option<&[Real]> {
        self.rates.get(entry.idx()).and_then(|r| r.as_deref())
    }

    fn splitting_rates_mut(&mut self, entry: LinkSegmentId) -> Option<&mut [Real]> {
        self.rates.get_mut(entry.idx()).and_then(|r| r.as_deref_mut())
    }

    fn register_tracked_node(&mut self, node: &Node) -> bool {
        self.activate(node)
    }

    fn register_potentially_blocking_node(&mut self, node: &Node) -> bool {
        self.activate(node)
    }

    fn reset(&mut self) {
        self.activated.fill(false);
        self.rates.fill(None);
    }

    fn reset_potentially_blocking_nodes(&mut self) {
        // Activated nodes are blocking by construction.
    }
}
