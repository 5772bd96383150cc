//! Atomic `f32` accumulator for the particle-to-grid scatter.

use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as its bit pattern in an `AtomicU32`.
///
/// `fetch_add` is a compare-exchange loop, so concurrent adds into the same
/// cell never lose a contribution. Summation order is whatever the scheduler
/// produces.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    #[inline]
    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }

    /// Add `value` and return the previous value.
    #[inline]
    pub fn fetch_add(&self, value: f32, order: Ordering) -> f32 {
        let prev = match self.0.fetch_update(order, Ordering::Relaxed, |bits| {
            Some((f32::from_bits(bits) + value).to_bits())
        }) {
            Ok(bits) | Err(bits) => bits,
        };
        f32::from_bits(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_fetch_add_returns_previous() {
        let a = AtomicF32::new(1.5);
        let prev = a.fetch_add(2.0, Ordering::Relaxed);
        assert_eq!(prev, 1.5);
        assert_eq!(a.load(Ordering::Relaxed), 3.5);
    }

    #[test]
    fn test_parallel_adds_are_not_lost() {
        let a = AtomicF32::new(0.0);
        (0..10_000).into_par_iter().for_each(|_| {
            a.fetch_add(1.0, Ordering::Relaxed);
        });
        // Integers up to 2^24 are exact in f32
        assert_eq!(a.load(Ordering::Relaxed), 10_000.0);
    }
}
