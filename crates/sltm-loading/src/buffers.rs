//! Double-buffered per-segment flow and factor vectors.
//!
//! Every quantity has a `current` and a `next` slot. Updates write `next`
//! while reading `current`; `swap` is the only way `next` becomes `current`.

use sltm_core::Real;

/// Slot selector for explicit copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Current,
    Next,
}

/// Two equally sized vectors with an index flip.
#[derive(Debug, Clone)]
pub struct DoubleBuffer {
    slots: [Vec<Real>; 2],
    current: usize,
    default_value: Real,
}

impl DoubleBuffer {
    pub fn new(len: usize, default_value: Real) -> Self {
        Self {
            slots: [vec![default_value; len], vec![default_value; len]],
            current: 0,
            default_value,
        }
    }

    pub fn len(&self) -> usize {
        self.slots[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current(&self) -> &[Real] {
        &self.slots[self.current]
    }

    pub fn next(&self) -> &[Real] {
        &self.slots[1 - self.current]
    }

    pub(crate) fn current_mut(&mut self) -> &mut [Real] {
        &mut self.slots[self.current]
    }

    pub(crate) fn next_mut(&mut self) -> &mut [Real] {
        &mut self.slots[1 - self.current]
    }

    /// Read `current` while writing `next`.
    pub(crate) fn split_mut(&mut self) -> (&[Real], &mut [Real]) {
        let (a, b) = self.slots.split_at_mut(1);
        if self.current == 0 {
            (a[0].as_slice(), b[0].as_mut_slice())
        } else {
            (b[0].as_slice(), a[0].as_mut_slice())
        }
    }

    /// O(1) exchange of the two slots.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Fill both slots with the default value.
    pub fn reset(&mut self) {
        let v = self.default_value;
        for slot in &mut self.slots {
            slot.fill(v);
        }
    }

    /// Full-vector copy between slots.
    pub fn copy(&mut self, from: Slot, to: Slot) {
        if from == to {
            return;
        }
        let (src, dst) = match from {
            Slot::Current => self.split_mut(),
            Slot::Next => {
                let (a, b) = self.slots.split_at_mut(1);
                if self.current == 0 {
                    (b[0].as_slice(), a[0].as_mut_slice())
                } else {
                    (a[0].as_slice(), b[0].as_mut_slice())
                }
            }
        };
        dst.copy_from_slice(src);
    }

    /// Overwrite a slot with `values` (lengths must match).
    pub(crate) fn assign(&mut self, slot: Slot, values: &[Real]) {
        let dst = match slot {
            Slot::Current => self.current_mut(),
            Slot::Next => self.next_mut(),
        };
        let n = dst.len().min(values.len());
        dst[..n].copy_from_slice(&values[..n]);
    }

    /// Element-wise minimum with the segment capacities.
    pub fn limit_to_capacity(&mut self, slot: Slot, capacities: &[Real]) {
        let values = match slot {
            Slot::Current => self.current_mut(),
            Slot::Next => self.next_mut(),
        };
        for (v, &c) in values.iter_mut().zip(capacities) {
            if *v > c {
                *v = c;
            }
        }
    }
}

/// All per-segment state owned by one loading.
#[derive(Debug, Clone)]
pub struct LoadingBuffers {
    pub(crate) sending: DoubleBuffer,
    pub(crate) receiving: DoubleBuffer,
    pub(crate) inflow: DoubleBuffer,
    pub(crate) outflow: DoubleBuffer,
    /// alpha
    pub(crate) flow_acceptance: DoubleBuffer,
    /// beta
    pub(crate) flow_capacity: DoubleBuffer,
    /// gamma
    pub(crate) storage_capacity: DoubleBuffer,
}

impl LoadingBuffers {
    pub fn new(segment_count: usize) -> Self {
        Self {
            sending: DoubleBuffer::new(segment_count, 0.0),
            receiving: DoubleBuffer::new(segment_count, 0.0),
            inflow: DoubleBuffer::new(segment_count, 0.0),
            outflow: DoubleBuffer::new(segment_count, 0.0),
            flow_acceptance: DoubleBuffer::new(segment_count, 1.0),
            flow_capacity: DoubleBuffer::new(segment_count, 1.0),
            storage_capacity: DoubleBuffer::new(segment_count, 1.0),
        }
    }

    /// Zero flows and identity factors.
    pub fn reset(&mut self) {
        for buffer in [
            &mut self.sending,
            &mut self.receiving,
            &mut self.inflow,
            &mut self.outflow,
            &mut self.flow_acceptance,
            &mut self.flow_capacity,
            &mut self.storage_capacity,
        ] {
            buffer.reset();
        }
    }

    pub fn segment_count(&self) -> usize {
        self.sending.len()
    }

    pub fn sending_flows(&self) -> &[Real] {
        self.sending.current()
    }

    pub fn receiving_flows(&self) -> &[Real] {
        self.receiving.current()
    }

    pub fn inflows(&self) -> &[Real] {
        self.inflow.current()
    }

    pub fn outflows(&self) -> &[Real] {
        self.outflow.current()
    }

    pub fn flow_acceptance_factors(&self) -> &[Real] {
        self.flow_acceptance.current()
    }

    pub fn flow_capacity_factors(&self) -> &[Real] {
        self.flow_capacity.current()
    }

    pub fn storage_capacity_factors(&self) -> &[Real] {
        self.storage_capacity.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_exchanges_slots() {
        let mut b = DoubleBuffer::new(3, 0.0);
        b.next_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(b.current(), &[0.0, 0.0, 0.0]);
        b.swap();
        assert_eq!(b.current(), &[1.0, 2.0, 3.0]);
        assert_eq!(b.next(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn split_mut_reads_current_writes_next() {
        let mut b = DoubleBuffer::new(2, 1.0);
        b.swap();
        let (cur, next) = b.split_mut();
        next[0] = cur[0] * 4.0;
        assert_eq!(b.next()[0], 4.0);
        assert_eq!(b.current()[0], 1.0);
    }

    #[test]
    fn copy_both_directions() {
        let mut b = DoubleBuffer::new(2, 0.0);
        b.current_mut()[1] = 7.0;
        b.copy(Slot::Current, Slot::Next);
        assert_eq!(b.next(), &[0.0, 7.0]);
        b.next_mut()[0] = 3.0;
        b.copy(Slot::Next, Slot::Current);
        assert_eq!(b.current(), &[3.0, 7.0]);
    }

    #[test]
    fn limit_to_capacity_is_elementwise_min() {
        let mut b = DoubleBuffer::new(3, 0.0);
        b.assign(Slot::Current, &[500.0, 2500.0, 1000.0]);
        b.limit_to_capacity(Slot::Current, &[1000.0, 2000.0, 1000.0]);
        assert_eq!(b.current(), &[500.0, 2000.0, 1000.0]);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut buffers = LoadingBuffers::new(2);
        buffers.flow_acceptance.current_mut()[0] = 0.5;
        buffers.sending.current_mut()[1] = 10.0;
        buffers.reset();
        assert_eq!(buffers.flow_acceptance_factors(), &[1.0, 1.0]);
        assert_eq!(buffers.sending_flows(), &[0.0, 0.0]);
    }
}
