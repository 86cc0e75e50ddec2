//! Sparse splitting-rate store for partially tracked networks.

use super::SplittingRateStore;
use crate::scheme::TrackingScope;
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::Node;
use std::collections::{BTreeSet, HashMap};

/// Tracked nodes held sparsely, blocking flags as a network-sized membership
/// vector, rate vectors in a map keyed by entry segment.
#[derive(Debug, Clone, Default)]
pub struct PartialSplittingRates {
    tracked: BTreeSet<NodeId>,
    blocking: Vec<bool>,
    rates: HashMap<LinkSegmentId, Vec<Real>>,
}

impl PartialSplittingRates {
    pub fn new(node_count: usize) -> Self {
        Self {
            tracked: BTreeSet::new(),
            blocking: vec![false; node_count],
            rates: HashMap::new(),
        }
    }

    fn ensure_blocking_capacity(&mut self, node: NodeId) {
        if node.idx() >= self.blocking.len() {
            self.blocking.resize(node.idx() + 1, false);
        }
    }
}

impl SplittingRateStore for PartialSplittingRates {
    fn tracking_scope(&self) -> TrackingScope {
        TrackingScope::Partial
    }

    fn is_tracked(&self, node: NodeId) -> bool {
        self.tracked.contains(&node)
    }

    fn is_potentially_blocking(&self, node: NodeId) -> bool {
        self.blocking.get(node.idx()).copied().unwrap_or(false)
    }

    fn tracked_nodes(&self) -> Vec<NodeId> {
        self.tracked.iter().copied().collect()
    }

    fn potentially_blocking_nodes(&self) -> Vec<NodeId> {
        self.tracked
            .iter()
            .copied()
            .filter(|&n| self.is_potentially_blocking(n))
            .collect()
    }

    fn splitting_rates(&self, entry: LinkSegmentId) -> Option<&[Real]> {
        self.rates.get(&entry).map(Vec::as_slice)
    }

    fn splitting_rates_mut(&mut self, entry: LinkSegmentId) -> Option<&mut [Real]> {
        self.rates.get_mut(&entry).map(Vec::as_mut_slice)
    }

    fn register_tracked_node(&mut self, node: &Node) -> bool {
        if node.centroid || !self.tracked.insert(node.id) {
            return false;
        }
        let exits = node.exit_segments().len();
        for &entry in node.entry_segments() {
            self.rates.entry(entry).or_insert_with(|| vec![0.0; exits]);
        }
        true
    }

    fn register_potentially_blocking_node(&mut self, node: &Node) -> bool {
        if node.centroid {
            return false;
        }
        self.register_tracked_node(node);
        self.ensure_blocking_capacity(node.id);
        let flag = &mut self.blocking[node.id.idx()];
        let newly = !*flag;
        *flag = true;
        newly
    }

    fn reset(&mut self) {
        self.tracked.clear();
        self.blocking.fill(false);
        self.rates.clear();
    }

    fn reset_potentially_blocking_nodes(&mut self) {
        self.blocking.fill(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sltm_core::{km, pcu_per_hour};
    use sltm_network::NetworkBuilder;

    #[test]
    fn tracked_but_not_blocking() {
        let mut b = NetworkBuilder::new();
        let n1 = b.add_node("1");
        let n2 = b.add_node("2");
        let n3 = b.add_node("3");
        let s12 = b.add_link_segment("12", n1, n2, pcu_per_hour(1000.0), km(1.0));
        b.add_link_segment("23", n2, n3, pcu_per_hour(1000.0), km(1.0));
        let network = b.build().unwrap();

        let mut store = PartialSplittingRates::new(network.node_count());
        assert!(store.register_tracked_node(network.node(n2).unwrap()));
        assert!(!store.register_tracked_node(network.node(n2).unwrap()));
        assert!(store.is_tracked(n2));
        assert!(!store.is_potentially_blocking(n2));
        assert!(store.potentially_blocking_nodes().is_empty());
        assert_eq!(store.splitting_rates(s12).unwrap(), &[0.0]);

        store.splitting_rates_mut(s12).unwrap()[0] = 1.0;
        assert!(store.register_potentially_blocking_node(network.node(n2).unwrap()));
        assert_eq!(store.splitting_rates(s12).unwrap(), &[1.0]);
        assert_eq!(store.potentially_blocking_nodes(), vec![n2]);

        store.reset_potentially_blocking_nodes();
        assert!(store.is_tracked(n2));
        assert!(!store.is_potentially_blocking(n2));

        store.reset();
        assert!(store.tracked_nodes().is_empty());
        assert!(store.splitting_rates(s12).is_none());
    }
}
