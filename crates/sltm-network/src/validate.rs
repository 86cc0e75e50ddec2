//! Internal validation logic for network construction.

use crate::error::{NetworkError, NetworkResult};
use crate::network::{LinkSegment, Node};

/// Validate segment endpoints and attributes before adjacency is built.
pub(crate) fn validate_structure(nodes: &[Node], segments: &[LinkSegment]) -> NetworkResult<()> {
    let node_count = nodes.len();

    for seg in segments {
        for node in [seg.upstream, seg.downstream] {
            if node.idx() >= node_count {
                return Err(NetworkError::InvalidNodeRef {
                    segment: seg.id,
                    node,
                });
            }
        }

        if seg.upstream == seg.downstream {
            return Err(NetworkError::SelfLoop {
                segment: seg.id,
                node: seg.upstream,
            });
        }

        if nodes[seg.upstream.idx()].centroid && nodes[seg.downstream.idx()].centroid {
            return Err(NetworkError::CentroidToCentroid { segment: seg.id });
        }

        if !seg.capacity_pcu_h.is_finite() || seg.capacity_pcu_h <= 0.0 {
            return Err(NetworkError::InvalidCapacity {
                segment: seg.id,
                value: seg.capacity_pcu_h,
            });
        }

        if !seg.length_km.is_finite() || seg.length_km < 0.0 {
            return Err(NetworkError::InvalidLength {
                segment: seg.id,
                value: seg.length_km,
            });
        }
    }

    Ok(())
}

/// Validate that every segment listed at a node actually touches it.
pub(crate) fn validate_adjacency(nodes: &[Node], segments: &[LinkSegment]) -> NetworkResult<()> {
    for node in nodes {
        for &sid in &node.entry_segments {
            let seg = segments
                .get(sid.idx())
                .ok_or(NetworkError::IdNotFound { what: "LinkSegmentId" })?;
            if seg.downstream != node.id {
                return Err(NetworkError::InconsistentAdjacency {
                    segment: sid,
                    node: node.id,
                });
            }
        }
        for &sid in &node.exit_segments {
            let seg = segments
                .get(sid.idx())
                .ok_or(NetworkError::IdNotFound { what: "LinkSegmentId" })?;
            if seg.upstream != node.id {
                return Err(NetworkError::InconsistentAdjacency {
                    segment: sid,
                    node: node.id,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sltm_core::Id;

    fn node(i: u32, centroid: bool) -> Node {
        Node {
            id: Id::from_index(i),
            name: format!("N{i}"),
            centroid,
            entry_segments: Vec::new(),
            exit_segments: Vec::new(),
        }
    }

    fn segment(i: u32, up: u32, down: u32, capacity: f64) -> LinkSegment {
        LinkSegment {
            id: Id::from_index(i),
            name: format!("S{i}"),
            upstream: Id::from_index(up),
            downstream: Id::from_index(down),
            capacity_pcu_h: capacity,
            length_km: 1.0,
            connector: false,
        }
    }

    #[test]
    fn rejects_unknown_node() {
        let nodes = vec![node(0, false)];
        let segs = vec![segment(0, 0, 3, 100.0)];
        assert!(matches!(
            validate_structure(&nodes, &segs),
            Err(NetworkError::InvalidNodeRef { .. })
        ));
    }

    #[test]
    fn rejects_zero_capacity() {
        let nodes = vec![node(0, false), node(1, false)];
        let segs = vec![segment(0, 0, 1, 0.0)];
        assert!(matches!(
            validate_structure(&nodes, &segs),
            Err(NetworkError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn rejects_centroid_pair() {
        let nodes = vec![node(0, true), node(1, true)];
        let segs = vec![segment(0, 0, 1, 100.0)];
        assert!(matches!(
            validate_structure(&nodes, &segs),
            Err(NetworkError::CentroidToCentroid { .. })
        ));
    }

    #[test]
    fn detects_bad_adjacency() {
        let mut nodes = vec![node(0, false), node(1, false)];
        nodes[0].entry_segments.push(Id::from_index(0));
        let segs = vec![segment(0, 0, 1, 100.0)];
        assert!(matches!(
            validate_adjacency(&nodes, &segs),
            Err(NetworkError::InconsistentAdjacency { .. })
        ));
    }
}
