//! Network-specific error types.

use sltm_core::{LinkSegmentId, NodeId, SltmError};

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Network construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// A link segment refers to a node that doesn't exist.
    InvalidNodeRef { segment: LinkSegmentId, node: NodeId },

    /// A link segment starts and ends at the same node.
    SelfLoop { segment: LinkSegmentId, node: NodeId },

    /// A link segment directly joins two centroids.
    CentroidToCentroid { segment: LinkSegmentId },

    /// Capacity must be finite and strictly positive.
    InvalidCapacity { segment: LinkSegmentId, value: f64 },

    /// Length must be finite and non-negative.
    InvalidLength { segment: LinkSegmentId, value: f64 },

    /// Adjacency is inconsistent (segment listed at a node it does not touch).
    InconsistentAdjacency { segment: LinkSegmentId, node: NodeId },

    /// ID not found in the network.
    IdNotFound { what: &'static str },
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::InvalidNodeRef { segment, node } => {
                write!(f, "Link segment {} refers to non-existent node {}", segment, node)
            }
            NetworkError::SelfLoop { segment, node } => {
                write!(f, "Link segment {} loops on node {}", segment, node)
            }
            NetworkError::CentroidToCentroid { segment } => {
                write!(f, "Link segment {} joins two centroids", segment)
            }
            NetworkError::InvalidCapacity { segment, value } => {
                write!(f, "Link segment {} has invalid capacity {}", segment, value)
            }
            NetworkError::InvalidLength { segment, value } => {
                write!(f, "Link segment {} has invalid length {}", segment, value)
            }
            NetworkError::InconsistentAdjacency { segment, node } => {
                write!(
                    f,
                    "Link segment {} in node {}'s adjacency list but doesn't touch that node",
                    segment, node
                )
            }
            NetworkError::IdNotFound { what } => {
                write!(f, "{} not found in network", what)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<NetworkError> for SltmError {
    fn from(err: NetworkError) -> Self {
        SltmError::Invariant {
            what: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sltm_core::Id;

    #[test]
    fn error_display_mentions_segment() {
        let err = NetworkError::InvalidCapacity {
            segment: Id::from_index(4),
            value: -1.0,
        };
        assert!(err.to_string().contains("Link segment 4"));
    }

    #[test]
    fn converts_into_core_error() {
        let err: SltmError = NetworkError::IdNotFound { what: "NodeId" }.into();
        assert!(matches!(err, SltmError::Invariant { .. }));
    }
}
