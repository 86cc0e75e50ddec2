//! Norm-based gap functions.

use crate::settings::{GapNorm, GapSettings};
use sltm_core::Real;

/// Accumulates element-wise differences between two vectors and reduces them
/// with the configured norm.
#[derive(Debug, Clone)]
pub struct NormBasedGapFunction {
    settings: GapSettings,
    accumulated: Real,
    measured: usize,
    gap: Real,
}

impl NormBasedGapFunction {
    pub fn new(settings: GapSettings) -> Self {
        Self {
            settings,
            accumulated: 0.0,
            measured: 0,
            gap: Real::INFINITY,
        }
    }

    pub fn settings(&self) -> &GapSettings {
        &self.settings
    }

    /// Start a new measurement.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.measured = 0;
        self.gap = Real::INFINITY;
    }

    /// Add one element pair.
    pub fn increase(&mut self, current: Real, next: Real) {
        let d = (next - current).abs();
        match self.settings.norm {
            GapNorm::L1 => self.accumulated += d,
            GapNorm::L2 => self.accumulated += d * d,
            GapNorm::LInf => self.accumulated = self.accumulated.max(d),
        }
        self.measured += 1;
    }

    /// Reduce the accumulated differences to the gap and remember it.
    pub fn compute(&mut self) -> Real {
        if self.measured == 0 {
            self.gap = 0.0;
            return self.gap;
        }
        let n = self.measured as Real;
        self.gap = match (self.settings.norm, self.settings.averaged) {
            (GapNorm::L1, false) => self.accumulated,
            (GapNorm::L1, true) => self.accumulated / n,
            (GapNorm::L2, false) => self.accumulated.sqrt(),
            (GapNorm::L2, true) => (self.accumulated / n).sqrt(),
            (GapNorm::LInf, _) => self.accumulated,
        };
        self.gap
    }

    /// Reset, measure the given indices of both vectors and compute.
    pub fn measure<I>(&mut self, current: &[Real], next: &[Real], indices: I) -> Real
    where
        I: IntoIterator<Item = usize>,
    {
        self.reset();
        for i in indices {
            self.increase(current[i], next[i]);
        }
        self.compute()
    }

    /// Last computed gap.
    pub fn gap(&self) -> Real {
        self.gap
    }

    pub fn has_converged(&self) -> bool {
        self.gap < self.settings.epsilon
    }

    /// `iteration` is 0-based.
    pub fn max_iterations_reached(&self, iteration: usize) -> bool {
        iteration + 1 >= self.settings.max_iterations
    }
}
