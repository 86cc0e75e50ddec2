//! Core network data structures.

use sltm_core::{LinkSegmentId, NodeId, Real};

/// A vertex of the network.
///
/// Entry and exit segments are kept in a stable order (ascending segment id);
/// splitting-rate vectors and node-model matrices are laid out in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Demand source/sink. Centroids are never potentially blocking.
    pub centroid: bool,
    pub(crate) entry_segments: Vec<LinkSegmentId>,
    pub(crate) exit_segments: Vec<LinkSegmentId>,
}

impl Node {
    /// Segments whose downstream node is this node.
    pub fn entry_segments(&self) -> &[LinkSegmentId] {
        &self.entry_segments
    }

    /// Segments whose upstream node is this node.
    pub fn exit_segments(&self) -> &[LinkSegmentId] {
        &self.exit_segments
    }
}

/// A directed arc between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSegment {
    pub id: LinkSegmentId,
    pub name: String,
    pub upstream: NodeId,
    pub downstream: NodeId,
    /// Capacity in pcu/h.
    pub capacity_pcu_h: Real,
    /// Length in km.
    pub length_km: Real,
    /// Virtual segment linking a centroid to the physical network.
    pub connector: bool,
}

/// The network: a validated, immutable collection of nodes and link segments.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) segments: Vec<LinkSegment>,
    pub(crate) connector_capacity: Real,
}

impl Network {
    /// Return all nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return all link segments (indexed by their id).
    pub fn link_segments(&self) -> &[LinkSegment] {
        &self.segments
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Get a node by ID (returns None if ID out of bounds).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    /// Get a link segment by ID (returns None if ID out of bounds).
    pub fn link_segment(&self, id: LinkSegmentId) -> Option<&LinkSegment> {
        self.segments.get(id.idx())
    }

    /// Capacity (pcu/h) per link segment, indexed by segment id.
    pub fn capacities(&self) -> Vec<Real> {
        self.segments.iter().map(|s| s.capacity_pcu_h).collect()
    }

    /// Capacity of a segment (pcu/h), 0 for unknown ids.
    pub fn capacity_pcu_h(&self, id: LinkSegmentId) -> Real {
        self.link_segment(id).map_or(0.0, |s| s.capacity_pcu_h)
    }

    /// Upper bound applied to entry capacities handed to a node model.
    ///
    /// Largest physical capacity in the network, so connectors do not dominate
    /// merge priorities with their virtual capacity.
    pub fn max_in_capacity(&self) -> Real {
        self.segments
            .iter()
            .filter(|s| !s.connector)
            .map(|s| s.capacity_pcu_h)
            .fold(None, |acc: Option<Real>, c| Some(acc.map_or(c, |a| a.max(c))))
            .unwrap_or(self.connector_capacity)
    }

    /// Iterate over centroid node ids.
    pub fn centroids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.centroid).map(|n| n.id)
    }

    /// Upstream node of a segment.
    pub fn upstream_node(&self, id: LinkSegmentId) -> Option<&Node> {
        self.link_segment(id).and_then(|s| self.node(s.upstream))
    }

    /// Downstream node of a segment.
    pub fn downstream_node(&self, id: LinkSegmentId) -> Option<&Node> {
        self.link_segment(id).and_then(|s| self.node(s.downstream))
    }
}
