//! Solution schemes of the loading and their escalation order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Solution scheme variants, declared in increasing order of strictness.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SolutionScheme {
    /// Only potentially blocking nodes are tracked, single-pass sending flow update.
    #[default]
    PointQueueBasic,
    /// Every used node is tracked, sending flows iterate to a local fixed point.
    PointQueueAdvanced,
    PhysicalQueueBasic,
    PhysicalQueueIntermediate,
    PhysicalQueueAdvanced,
    PhysicalQueueExtended,
}

/// Whether splitting rates are kept for a subset or all used nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingScope {
    Partial,
    Complete,
}

impl SolutionScheme {
    pub fn is_point_queue(self) -> bool {
        matches!(
            self,
            SolutionScheme::PointQueueBasic | SolutionScheme::PointQueueAdvanced
        )
    }

    pub fn is_physical_queue(self) -> bool {
        !self.is_point_queue()
    }

    pub fn tracking_scope(self) -> TrackingScope {
        match self {
            SolutionScheme::PointQueueBasic => TrackingScope::Partial,
            _ => TrackingScope::Complete,
        }
    }

    /// Nested sending/receiving flow loops run to their own stop criterion.
    pub fn iterates_inner_loops(self) -> bool {
        self != SolutionScheme::PointQueueBasic
    }

    /// Next, stricter scheme, if any.
    pub fn escalate(self) -> Option<SolutionScheme> {
        match self {
            SolutionScheme::PointQueueBasic => Some(SolutionScheme::PointQueueAdvanced),
            _ => None,
        }
    }

    /// Pick the scheme a loading starts in.
    ///
    /// Storage constraints require a physical queue scheme: a requested point
    /// queue scheme falls back to the basic physical queue. Requesting a
    /// physical queue without storage constraints is rejected.
    pub fn select_initial(
        requested: SolutionScheme,
        enforce_storage_constraints: bool,
    ) -> Result<SolutionScheme, String> {
        match (enforce_storage_constraints, requested.is_physical_queue()) {
            (false, false) | (true, true) => Ok(requested),
            (true, false) => Ok(SolutionScheme::PhysicalQueueBasic),
            (false, true) => Err(format!(
                "solution scheme {requested} requires storage constraints to be enabled"
            )),
        }
    }
}

impl fmt::Display for SolutionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolutionScheme::PointQueueBasic => "point_queue_basic",
            SolutionScheme::PointQueueAdvanced => "point_queue_advanced",
            SolutionScheme::PhysicalQueueBasic => "physical_queue_basic",
            SolutionScheme::PhysicalQueueIntermediate => "physical_queue_intermediate",
            SolutionScheme::PhysicalQueueAdvanced => "physical_queue_advanced",
            SolutionScheme::PhysicalQueueExtended => "physical_queue_extended",
        };
        write!(f, "{s}")
    }
}
