//! Persistable snapshot of a finished loading.

use crate::scheme::SolutionScheme;
use serde::Serialize;
use sltm_core::{LinkSegmentId, Real};

/// Per-segment flows (pcu/h) and factors, indexed by link segment id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadingResults {
    pub scheme: SolutionScheme,
    pub iterations: usize,
    pub converged: bool,
    pub inflow: Vec<Real>,
    pub outflow: Vec<Real>,
    pub sending: Vec<Real>,
    pub receiving: Vec<Real>,
    /// alpha
    pub flow_acceptance: Vec<Real>,
    /// beta
    pub flow_capacity: Vec<Real>,
    /// gamma
    pub storage_capacity: Vec<Real>,
}

fn at(values: &[Real], segment: LinkSegmentId) -> Real {
    values.get(segment.idx()).copied().unwrap_or(0.0)
}

impl LoadingResults {
    pub fn segment_count(&self) -> usize {
        self.inflow.len()
    }

    pub fn inflow(&self, segment: LinkSegmentId) -> Real {
        at(&self.inflow, segment)
    }

    pub fn outflow(&self, segment: LinkSegmentId) -> Real {
        at(&self.outflow, segment)
    }

    pub fn sending(&self, segment: LinkSegmentId) -> Real {
        at(&self.sending, segment)
    }

    pub fn receiving(&self, segment: LinkSegmentId) -> Real {
        at(&self.receiving, segment)
    }

    pub fn flow_acceptance(&self, segment: LinkSegmentId) -> Real {
        at(&self.flow_acceptance, segment)
    }

    pub fn total_inflow(&self) -> Real {
        self.inflow.iter().sum()
    }

    pub fn total_outflow(&self) -> Real {
        self.outflow.iter().sum()
    }
}

/// What a complete run reports back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadingOutcome {
    pub converged: bool,
    pub iterations: usize,
    pub final_gap: Real,
    pub scheme: SolutionScheme,
    pub results: LoadingResults,
}
