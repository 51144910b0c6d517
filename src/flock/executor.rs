// Fork-join helpers over a fixed-size rayon pool.
//
// Both primitives hand every task its own `&mut` sub-slice, so write sets are
// disjoint by construction and no locking is needed. Each call returns only
// after every partition has finished.

use std::ops::Range;

use rayon::prelude::*;

use super::error::Result;

/// Fixed-size worker pool used by the aggregation and steering phases.
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
}

impl ParallelExecutor {
    /// Build a pool with `threads` workers, or one per hardware thread when
    /// `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(default_parallelism);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("flock-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Call `f(i, &mut slots[i])` once for every index.
    ///
    /// Used where each unit of work is independent and roughly the same
    /// size as any other (one call per occupied cell).
    pub fn parallel_for<T, F>(&self, slots: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        self.pool.install(|| {
            slots
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| f(i, slot));
        });
    }

    /// Split `a` and `b` into matching contiguous blocks, one per worker,
    /// and call `f(range, &mut a[range], &mut b[range])` for each.
    pub fn parallel_for_blocks<A, B, F>(&self, a: &mut [A], b: &mut [B], f: F)
    where
        A: Send,
        B: Send,
        F: Fn(Range<usize>, &mut [A], &mut [B]) + Sync + Send,
    {
        assert_eq!(a.len(), b.len(), "block partitions must cover equal lengths");
        let block = block_size(a.len(), self.workers());
        self.pool.install(|| {
            a.par_chunks_mut(block)
                .zip(b.par_chunks_mut(block))
                .enumerate()
                .for_each(|(n, (block_a, block_b))| {
                    let start = n * block;
                    f(start..start + block_a.len(), block_a, block_b);
                });
        });
    }
}

/// Contiguous block length giving each of `workers` one block.
pub fn block_size(count: usize, workers: usize) -> usize {
    count.div_ceil(workers.max(1)).max(1)
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
