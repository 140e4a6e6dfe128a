//! CPU strategy drivers. Each runs generations until the grid stabilizes
//! or the budget runs out, following the same contract: evaluate one
//! generation into the next buffer, return the 1-based generation index if
//! nothing changed (without swapping), otherwise swap and continue.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::{ChunkPolicy, Simulation};
use crate::kernel::{step_region, step_region_raw, Region};

/// Raw pointer wrapper so disjoint tile regions of the next buffer can be
/// written from the pool. The pointer stays behind a private field and an
/// accessor: closures then capture the wrapper as a whole, not the raw
/// pointer itself, which is what keeps the Send/Sync impls in effect under
/// disjoint closure capture. Safety rests on tiles never overlapping.
#[derive(Clone, Copy)]
pub(crate) struct SendPtr<T> {
    inner: *mut T,
}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    pub(crate) fn new(inner: *mut T) -> Self {
        Self { inner }
    }

    #[inline]
    pub(crate) fn get(&self) -> *mut T {
        self.inner
    }
}

#[derive(Clone, Copy)]
pub(crate) struct SendConstPtr<T> {
    inner: *const T,
}

unsafe impl<T> Send for SendConstPtr<T> {}
unsafe impl<T> Sync for SendConstPtr<T> {}

impl<T> SendConstPtr<T> {
    pub(crate) fn new(inner: *const T) -> Self {
        Self { inner }
    }

    #[inline]
    pub(crate) fn get(&self) -> *const T {
        self.inner
    }
}

impl Simulation {
    #[inline]
    pub(crate) fn region_for_tile(&self, tx: usize, ty: usize) -> Region {
        Region {
            x: tx * self.tile_w,
            y: ty * self.tile_h,
            w: self.tile_w,
            h: self.tile_h,
        }
    }

    pub(crate) fn compute_sequential(&mut self, max_generations: u32) -> u32 {
        let dim = self.dim;
        for generation in 1..=max_generations {
            let (current, next) = self.grid.current_and_next_mut();
            let changed = step_region(current, next, dim, Region::full(dim));
            if !changed {
                self.generation += generation as u64;
                return generation;
            }
            self.grid.swap();
        }
        self.generation += max_generations as u64;
        0
    }

    pub(crate) fn compute_tiled(&mut self, max_generations: u32) -> u32 {
        let dim = self.dim;
        let (tiles_x, tiles_y) = (self.tiles_x, self.tiles_y);
        for generation in 1..=max_generations {
            let mut changed = false;
            for ty in 0..tiles_y {
                for tx in 0..tiles_x {
                    let region = self.region_for_tile(tx, ty);
                    let (current, next) = self.grid.current_and_next_mut();
                    changed |= step_region(current, next, dim, region);
                }
            }
            if !changed {
                self.generation += generation as u64;
                return generation;
            }
            self.grid.swap();
        }
        self.generation += max_generations as u64;
        0
    }

    pub(crate) fn compute_parallel_for(&mut self, max_generations: u32, chunk: ChunkPolicy) -> u32 {
        let dim = self.dim;
        let (tiles_x, tiles_y) = (self.tiles_x, self.tiles_y);
        let (tile_w, tile_h) = (self.tile_w, self.tile_h);
        let tile_count = tiles_x * tiles_y;
        let pool = &self.pool;
        let threads = pool.current_num_threads().max(1);

        for generation in 1..=max_generations {
            let (current, next) = self.grid.current_and_next_mut();
            let src = SendConstPtr::new(current.as_ptr());
            let dst = SendPtr::new(next.as_mut_ptr());

            let changed = pool.install(|| {
                let iter = (0..tile_count).into_par_iter();
                let step = move |idx: usize| {
                    let (tx, ty) = (idx % tiles_x, idx / tiles_x);
                    let region = Region {
                        x: tx * tile_w,
                        y: ty * tile_h,
                        w: tile_w,
                        h: tile_h,
                    };
                    // Tiles are disjoint, so parallel writes through dst
                    // never alias.
                    unsafe { step_region_raw(src.get(), dst.get(), dim, region) }
                };
                match chunk {
                    ChunkPolicy::Auto => iter.map(step).reduce(|| false, |a, b| a | b),
                    ChunkPolicy::Static => iter
                        .with_min_len(tile_count.div_ceil(threads))
                        .map(step)
                        .reduce(|| false, |a, b| a | b),
                    ChunkPolicy::Dynamic(n) => iter
                        .with_max_len(n.max(1))
                        .map(step)
                        .reduce(|| false, |a, b| a | b),
                }
            });

            if !changed {
                self.generation += generation as u64;
                return generation;
            }
            self.grid.swap();
        }
        self.generation += max_generations as u64;
        0
    }

    /// Lazy driver: clean tiles are skipped outright. Soundness of the skip
    /// rests on clean tiles holding identical interiors in both cell
    /// buffers, so the post-swap grid still reads correctly.
    pub(crate) fn compute_lazy(&mut self, max_generations: u32, chunk: ChunkPolicy) -> u32 {
        let dim = self.dim;
        let (tiles_x, tiles_y) = (self.tiles_x, self.tiles_y);
        let (tile_w, tile_h) = (self.tile_w, self.tile_h);
        let tile_count = tiles_x * tiles_y;
        let pool = &self.pool;
        let threads = pool.current_num_threads().max(1);

        for generation in 1..=max_generations {
            let dirty = &self.dirty;
            let (current, next) = self.grid.current_and_next_mut();
            let src = SendConstPtr::new(current.as_ptr());
            let dst = SendPtr::new(next.as_mut_ptr());

            let changed = pool.install(|| {
                let iter = (0..tile_count).into_par_iter();
                let step = move |idx: usize| {
                    let (tx, ty) = (idx % tiles_x, idx / tiles_x);
                    if !dirty.is_dirty(tx, ty) {
                        return false;
                    }
                    let region = Region {
                        x: tx * tile_w,
                        y: ty * tile_h,
                        w: tile_w,
                        h: tile_h,
                    };
                    let tile_changed = unsafe { step_region_raw(src.get(), dst.get(), dim, region) };
                    if tile_changed {
                        dirty.mark_neighborhood(tx, ty);
                    } else {
                        dirty.clear(tx, ty);
                    }
                    tile_changed
                };
                match chunk {
                    ChunkPolicy::Auto => iter.map(step).reduce(|| false, |a, b| a | b),
                    ChunkPolicy::Static => iter
                        .with_min_len(tile_count.div_ceil(threads))
                        .map(step)
                        .reduce(|| false, |a, b| a | b),
                    ChunkPolicy::Dynamic(n) => iter
                        .with_max_len(n.max(1))
                        .map(step)
                        .reduce(|| false, |a, b| a | b),
                }
            });

            if !changed {
                self.generation += generation as u64;
                return generation;
            }
            self.grid.swap();
            self.dirty.swap();
        }
        self.generation += max_generations as u64;
        0
    }

    pub(crate) fn compute_task_group(&mut self, max_generations: u32, grain: usize) -> u32 {
        let dim = self.dim;
        let (tiles_x, tiles_y) = (self.tiles_x, self.tiles_y);
        let (tile_w, tile_h) = (self.tile_w, self.tile_h);
        let tile_count = tiles_x * tiles_y;
        let grain = grain.max(1);
        let pool = &self.pool;

        for generation in 1..=max_generations {
            let (current, next) = self.grid.current_and_next_mut();
            let src = SendConstPtr::new(current.as_ptr());
            let dst = SendPtr::new(next.as_mut_ptr());
            let changed = AtomicBool::new(false);

            // Scope exit is the group barrier: every spawned task has
            // finished before the flag is read.
            pool.scope(|scope| {
                let mut start = 0;
                while start < tile_count {
                    let end = (start + grain).min(tile_count);
                    let changed = &changed;
                    scope.spawn(move |_| {
                        let mut local = false;
                        for idx in start..end {
                            let (tx, ty) = (idx % tiles_x, idx / tiles_x);
                            let region = Region {
                                x: tx * tile_w,
                                y: ty * tile_h,
                                w: tile_w,
                                h: tile_h,
                            };
                            local |= unsafe { step_region_raw(src.get(), dst.get(), dim, region) };
                        }
                        if local {
                            changed.store(true, Ordering::Relaxed);
                        }
                    });
                    start = end;
                }
            });

            if !changed.load(Ordering::Relaxed) {
                self.generation += generation as u64;
                return generation;
            }
            self.grid.swap();
        }
        self.generation += max_generations as u64;
        0
    }
}
