//! Loading configuration.

use crate::scheme::SolutionScheme;
use serde::{Deserialize, Serialize};
use sltm_core::Real;

/// Vector norm used by gap functions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapNorm {
    #[default]
    L1,
    L2,
    LInf,
}

/// Stop criterion of one gap function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapSettings {
    /// Converged once the gap drops below this value
    pub epsilon: Real,
    /// Iteration cap for the loop this gap controls
    pub max_iterations: usize,
    /// Norm applied to the element-wise differences
    pub norm: GapNorm,
    /// Divide by the number of measured elements
    pub averaged: bool,
}

impl Default for GapSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            max_iterations: 1000,
            norm: GapNorm::L1,
            averaged: true,
        }
    }
}

/// Trend rules of the convergence analyser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    /// Assume improvement until more iterations than this were registered
    pub min_iteration_threshold: usize,
    /// Assume stalling once more iterations than this were registered
    pub max_iteration_threshold: usize,
    /// Largest tolerated single-iteration gap increase
    pub worsening_threshold: Real,
    /// Average per-iteration improvement must exceed this
    pub min_improvement_threshold: Real,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            min_iteration_threshold: 2,
            max_iteration_threshold: 5,
            worsening_threshold: 0.1,
            min_improvement_threshold: 0.0,
        }
    }
}

/// Settings read by a network loading. Never modified by the loading itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticLtmSettings {
    /// Enable storage constraints (physical queues, spillback)
    pub enforce_storage_constraints: bool,
    /// Requested starting scheme
    pub initial_scheme: SolutionScheme,
    /// Outer loop: gap between successive flow acceptance factors
    pub flow_acceptance_gap: GapSettings,
    /// Step 2 inner loop
    pub sending_flow_gap: GapSettings,
    /// Step 4 inner loop (physical queues)
    pub receiving_flow_gap: GapSettings,
    pub convergence: ConvergenceSettings,
    /// Per-iteration and per-node debug output
    pub detailed_logging: bool,
    /// Never switch to a stricter scheme when stalling
    pub disable_escalation: bool,
}

impl StaticLtmSettings {
    /// Check value ranges; returns a description of the first violation.
    pub fn check(&self) -> Result<(), String> {
        for (name, gap) in [
            ("flow_acceptance_gap", &self.flow_acceptance_gap),
            ("sending_flow_gap", &self.sending_flow_gap),
            ("receiving_flow_gap", &self.receiving_flow_gap),
        ] {
            if !gap.epsilon.is_finite() || gap.epsilon <= 0.0 {
                return Err(format!("{name}.epsilon must be positive, got {}", gap.epsilon));
            }
            if gap.max_iterations == 0 {
                return Err(format!("{name}.max_iterations must be positive"));
            }
        }
        let c = &self.convergence;
        if c.min_iteration_threshold > c.max_iteration_threshold {
            return Err(format!(
                "convergence.min_iteration_threshold ({}) exceeds max_iteration_threshold ({})",
                c.min_iteration_threshold, c.max_iteration_threshold
            ));
        }
        if !c.worsening_threshold.is_finite() || !c.min_improvement_threshold.is_finite() {
            return Err("convergence thresholds must be finite".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = StaticLtmSettings::default();
        assert!(!s.enforce_storage_constraints);
        assert_eq!(s.initial_scheme, SolutionScheme::PointQueueBasic);
        assert_eq!(s.convergence.min_iteration_threshold, 2);
        assert_eq!(s.convergence.max_iteration_threshold, 5);
        assert_eq!(s.convergence.worsening_threshold, 0.1);
        assert_eq!(s.convergence.min_improvement_threshold, 0.0);
        assert!(s.check().is_ok());
    }

    #[test]
    fn check_rejects_bad_epsilon() {
        let mut s = StaticLtmSettings::default();
        s.sending_flow_gap.epsilon = 0.0;
        let err = s.check().unwrap_err();
        assert!(err.contains("sending_flow_gap"));
    }

    #[test]
    fn check_rejects_inverted_thresholds() {
        let mut s = StaticLtmSettings::default();
        s.convergence.min_iteration_threshold = 10;
        assert!(s.check().is_err());
    }
}
