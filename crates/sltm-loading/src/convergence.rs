//! Trend classification of the outer-loop gap sequence.

use crate::settings::ConvergenceSettings;
use sltm_core::Real;

/// Append-only record of outer-iteration gaps with a re-baselining offset.
#[derive(Debug, Clone)]
pub struct ConvergenceAnalyser {
    settings: ConvergenceSettings,
    gaps: Vec<Real>,
    iteration_offset: usize,
}

impl ConvergenceAnalyser {
    pub fn new(settings: ConvergenceSettings) -> Self {
        Self {
            settings,
            gaps: Vec::new(),
            iteration_offset: 0,
        }
    }

    pub fn register_gap(&mut self, gap: Real) {
        self.gaps.push(gap);
    }

    pub fn gaps(&self) -> &[Real] {
        &self.gaps
    }

    pub fn last_gap(&self) -> Option<Real> {
        self.gaps.last().copied()
    }

    /// Number of registered gaps.
    pub fn registered_iterations(&self) -> usize {
        self.gaps.len()
    }

    /// Gaps before `offset` are ignored by the trend rules.
    pub fn set_iteration_offset(&mut self, offset: usize) {
        self.iteration_offset = offset.min(self.gaps.len());
    }

    pub fn iteration_offset(&self) -> usize {
        self.iteration_offset
    }

    pub fn reset(&mut self) {
        self.gaps.clear();
        self.iteration_offset = 0;
    }

    /// Classify the gaps registered since the offset.
    ///
    /// Improving up to `min_iteration_threshold` iterations, stalled beyond
    /// `max_iteration_threshold`; in between, a single increase above
    /// `worsening_threshold` or an average improvement at or below
    /// `min_improvement_threshold` counts as not improving.
    pub fn is_improving(&self) -> bool {
        let window = &self.gaps[self.iteration_offset..];
        let n = window.len();
        if n <= self.settings.min_iteration_threshold || n < 2 {
            return true;
        }
        if n > self.settings.max_iteration_threshold {
            return false;
        }

        let last = window[n - 1];
        let previous = window[n - 2];
        if last - previous > self.settings.worsening_threshold {
            return false;
        }

        let average_improvement = (window[0] - last) / (n - 1) as Real;
        average_improvement > self.settings.min_improvement_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyser() -> ConvergenceAnalyser {
        ConvergenceAnalyser::new(ConvergenceSettings::default())
    }

    #[test]
    fn improving_below_min_threshold() {
        let mut a = analyser();
        a.register_gap(1.0);
        a.register_gap(5.0);
        assert!(a.is_improving());
    }

    #[test]
    fn stalled_beyond_max_threshold() {
        let mut a = analyser();
        for g in [1.0, 0.5, 0.25, 0.12, 0.06, 0.03] {
            a.register_gap(g);
        }
        assert!(!a.is_improving());
    }

    #[test]
    fn worsening_detected() {
        let mut a = analyser();
        for g in [0.5, 0.4, 0.6] {
            a.register_gap(g);
        }
        assert!(!a.is_improving());
    }

    #[test]
    fn flat_gap_is_not_improving() {
        let mut a = analyser();
        for g in [0.3, 0.3, 0.3] {
            a.register_gap(g);
        }
        assert!(!a.is_improving());
    }

    #[test]
    fn steady_decrease_is_improving() {
        let mut a = analyser();
        for g in [0.3, 0.2, 0.1, 0.05] {
            a.register_gap(g);
        }
        assert!(a.is_improving());
    }

    #[test]
    fn offset_rebaselines_window() {
        let mut a = analyser();
        for g in [1.0, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9] {
            a.register_gap(g);
        }
        assert!(!a.is_improving());
        a.set_iteration_offset(a.registered_iterations());
        assert!(a.is_improving());
        a.register_gap(0.5);
        a.register_gap(0.2);
        assert!(a.is_improving());
        assert_eq!(a.iteration_offset(), 7);
    }
}
