//! Partitioned parallel evaluation
//!
//! Both the transition and the weighting stage walk the whole particle set
//! with a pure per-item function. This module splits `[0, N)` into at most
//! P contiguous ranges and runs them on the rayon pool; P = 1 degrades to
//! the plain sequential loop with identical per-item results.

use rayon::prelude::*;

/// A partitioned parallel-for over contiguous index ranges.
///
/// Every index in `[0, N)` is visited exactly once and ranges never
/// overlap, so per-item functions may freely mutate their item without
/// synchronization as long as they touch no other shared mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    partitions: usize,
}

impl Partitioner {
    /// Creates a partitioner with the given partition count.
    ///
    /// # Panics
    /// Panics if `partitions` is zero.
    pub fn new(partitions: usize) -> Self {
        assert!(partitions > 0, "Partition count must be positive");
        Self { partitions }
    }

    /// Number of partitions the workload is split into.
    #[inline]
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Applies `f(index, &mut item)` to every item of the slice, splitting
    /// the work into at most `partitions` contiguous ranges.
    pub fn for_each_indexed<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if items.is_empty() {
            return;
        }
        let chunk_len = items.len().div_ceil(self.partitions);
        if self.partitions == 1 || chunk_len >= items.len() {
            for (i, item) in items.iter_mut().enumerate() {
                f(i, item);
            }
            return;
        }

        items
            .par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(chunk_index, chunk)| {
                let base = chunk_index * chunk_len;
                for (offset, item) in chunk.iter_mut().enumerate() {
                    f(base + offset, item);
                }
            });
    }

    /// Sums `f(&item)` over the slice, one partial sum per partition.
    ///
    /// The grouping of the floating-point summation depends on the
    /// partition count; everything else is deterministic.
    pub fn sum_by<T, F>(&self, items: &[T], f: F) -> f64
    where
        T: Sync,
        F: Fn(&T) -> f64 + Sync,
    {
        if items.is_empty() {
            return 0.0;
        }
        let chunk_len = items.len().div_ceil(self.partitions);
        if self.partitions == 1 || chunk_len >= items.len() {
            return items.iter().map(f).sum();
        }

        items
            .par_chunks(chunk_len)
            .map(|chunk| chunk.iter().map(&f).sum::<f64>())
            .sum()
    }
}
