//! Incremental network builder.

use sltm_core::constants::CONNECTOR_CAPACITY_PCU_H;
use sltm_core::units::{FlowRate, Length};
use sltm_core::{LinkSegmentId, NodeId, Real, as_km, as_pcu_per_hour};

use crate::error::NetworkResult;
use crate::network::{LinkSegment, Network, Node};
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Use `add_node`, `add_centroid`, `add_link_segment` and `add_connector` to
/// build up the network, then call `build()` to validate and freeze it into an
/// immutable `Network`.
#[derive(Debug)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    segments: Vec<LinkSegment>,
    connector_capacity: Real,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            segments: Vec::new(),
            connector_capacity: CONNECTOR_CAPACITY_PCU_H,
        }
    }
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the capacity (pcu/h) given to connectors added afterwards.
    pub fn with_connector_capacity(mut self, capacity: FlowRate) -> Self {
        self.connector_capacity = as_pcu_per_hour(capacity);
        self
    }

    /// Add a regular node and return its ID.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(name.into(), false)
    }

    /// Add a centroid (demand source/sink) and return its ID.
    pub fn add_centroid(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(name.into(), true)
    }

    fn push_node(&mut self, name: String, centroid: bool) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name,
            centroid,
            entry_segments: Vec::new(),
            exit_segments: Vec::new(),
        });
        id
    }

    /// Add a physical link segment from `upstream` to `downstream`.
    pub fn add_link_segment(
        &mut self,
        name: impl Into<String>,
        upstream: NodeId,
        downstream: NodeId,
        capacity: FlowRate,
        length: Length,
    ) -> LinkSegmentId {
        self.push_segment(
            name.into(),
            upstream,
            downstream,
            as_pcu_per_hour(capacity),
            as_km(length),
            false,
        )
    }

    /// Add a virtual connector segment with the builder's connector capacity.
    pub fn add_connector(
        &mut self,
        name: impl Into<String>,
        upstream: NodeId,
        downstream: NodeId,
    ) -> LinkSegmentId {
        let capacity = self.connector_capacity;
        self.push_segment(name.into(), upstream, downstream, capacity, 0.0, true)
    }

    fn push_segment(
        &mut self,
        name: String,
        upstream: NodeId,
        downstream: NodeId,
        capacity_pcu_h: Real,
        length_km: Real,
        connector: bool,
    ) -> LinkSegmentId {
        let id = LinkSegmentId::from_index(self.segments.len() as u32);
        self.segments.push(LinkSegment {
            id,
            name,
            upstream,
            downstream,
            capacity_pcu_h,
            length_km,
            connector,
        });
        id
    }

    /// Rename a node (useful for post-construction adjustments).
    pub fn rename_node(&mut self, node_id: NodeId, new_name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(node_id.idx()) {
            node.name = new_name.into();
        }
    }

    /// Build and validate the network, returning an immutable `Network`.
    pub fn build(mut self) -> NetworkResult<Network> {
        validate::validate_structure(&self.nodes, &self.segments)?;

        // Segments are visited in id order, so every adjacency list is sorted.
        for seg in &self.segments {
            self.nodes[seg.upstream.idx()].exit_segments.push(seg.id);
            self.nodes[seg.downstream.idx()].entry_segments.push(seg.id);
        }

        validate::validate_adjacency(&self.nodes, &self.segments)?;

        Ok(Network {
            nodes: self.nodes,
            segments: self.segments,
            connector_capacity: self.connector_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sltm_core::{km, pcu_per_hour};

    #[test]
    fn builder_basic() {
        let mut builder = NetworkBuilder::new();
        let n1 = builder.add_node("Node1");
        let n2 = builder.add_node("Node2");
        let s1 = builder.add_link_segment("S1", n1, n2, pcu_per_hour(1000.0), km(1.0));

        assert_eq!(n1.index(), 0);
        assert_eq!(n2.index(), 1);
        assert_eq!(s1.index(), 0);
        assert_eq!(builder.nodes.len(), 2);
        assert_eq!(builder.segments.len(), 1);
    }

    #[test]
    fn builder_rename() {
        let mut builder = NetworkBuilder::new();
        let n1 = builder.add_node("Old");
        builder.rename_node(n1, "New");
        assert_eq!(builder.nodes[0].name, "New");
    }

    #[test]
    fn connector_uses_builder_capacity() {
        let mut builder = NetworkBuilder::new().with_connector_capacity(pcu_per_hour(5000.0));
        let o = builder.add_centroid("O");
        let a = builder.add_node("A");
        let c = builder.add_connector("O-A", o, a);
        let network = builder.build().unwrap();
        let seg = network.link_segment(c).unwrap();
        assert!(seg.connector);
        assert!((seg.capacity_pcu_h - 5000.0).abs() < 1e-6);
    }

    #[test]
    fn builder_build_adjacency() {
        let mut builder = NetworkBuilder::new();
        let n1 = builder.add_node("N1");
        let n2 = builder.add_node("N2");
        let s = builder.add_link_segment("S", n1, n2, pcu_per_hour(1000.0), km(1.0));

        let network = builder.build().unwrap();
        assert_eq!(network.node(n1).unwrap().exit_segments(), &[s]);
        assert!(network.node(n1).unwrap().entry_segments().is_empty());
        assert_eq!(network.node(n2).unwrap().entry_segments(), &[s]);
    }
}
