//! Splitting-rate stores.
//!
//! A store keeps, per entry segment of every tracked node, the proportions of
//! that entry's flow leaving through each exit segment (exit order of the node).
//! Two strategies exist: a sparse one for networks where only a few nodes are
//! tracked, and a dense one where every used node is tracked and blocking.

mod complete;
mod partial;

pub use complete::CompleteSplittingRates;
pub use partial::PartialSplittingRates;

use crate::scheme::{SolutionScheme, TrackingScope};
use sltm_core::{LinkSegmentId, NodeId, Real};
use sltm_network::{Network, Node};

/// Contract shared by both splitting-rate strategies.
pub trait SplittingRateStore: std::fmt::Debug + Send + Sync {
    fn tracking_scope(&self) -> TrackingScope;

    fn is_tracked(&self, node: NodeId) -> bool;

    fn is_potentially_blocking(&self, node: NodeId) -> bool;

    /// Tracked nodes in ascending id order.
    fn tracked_nodes(&self) -> Vec<NodeId>;

    /// Potentially blocking nodes in ascending id order.
    fn potentially_blocking_nodes(&self) -> Vec<NodeId>;

    /// Exit proportions of an entry segment of a tracked node.
    fn splitting_rates(&self, entry: LinkSegmentId) -> Option<&[Real]>;

    fn splitting_rates_mut(&mut self, entry: LinkSegmentId) -> Option<&mut [Real]>;

    /// Track a node, allocating its rate vectors. Returns true if newly tracked.
    /// Centroids are never registered.
    fn register_tracked_node(&mut self, node: &Node) -> bool;

    /// Track a node and flag it potentially blocking. Returns true if the flag
    /// was newly set. Centroids are never registered.
    fn register_potentially_blocking_node(&mut self, node: &Node) -> bool;

    /// Forget all nodes and rates.
    fn reset(&mut self);

    /// Clear blocking flags, keeping tracked nodes and their rates.
    fn reset_potentially_blocking_nodes(&mut self);
}

/// Create the store matching the tracking scope of `scheme`.
pub fn create_splitting_rate_store(
    scheme: SolutionScheme,
    network: &Network,
) -> Box<dyn SplittingRateStore> {
    match scheme.tracking_scope() {
        TrackingScope::Partial => Box::new(PartialSplittingRates::new(network.node_count())),
        TrackingScope::Complete => Box::new(CompleteSplittingRates::new(
            network.node_count(),
            network.link_segment_count(),
        )),
    }
}
