//! Hybrid execution: a device lane owns the top band of rows, the host
//! pool owns the bottom band, and the two lanes exchange border rows every
//! `sync_period` generations. Between exchanges each lane reads bounded-
//! stale neighbor rows from its own copy of the grid.

use rayon::prelude::*;

use crate::engine::Simulation;
use crate::grid::Cell;
use crate::kernel::{step_region_raw, Region};
use crate::strategy::{SendConstPtr, SendPtr};

/// Device lane behind [`crate::Strategy::Hybrid`]. Implementations keep
/// a private double-buffered copy of the full grid and advance only the
/// band of rows they were constructed for.
pub trait Accelerator: Send {
    /// Seed both device buffers with the full host grid. Called once
    /// before the first generation.
    fn upload(&mut self, cells: &[Cell]);

    /// Advance the device band one generation and flip the device
    /// buffers. Returns whether any band cell changed; implementations
    /// without cheap change detection may report `true` unconditionally.
    fn advance(&mut self) -> bool;

    /// Copy device rows `[start, start + rows)` of the device current
    /// buffer into `dst`, which uses full-grid row-major layout.
    fn read_rows(&mut self, start: usize, rows: usize, dst: &mut [Cell]);

    /// Copy host rows `[start, start + rows)` from `src` into the device
    /// current buffer.
    fn write_rows(&mut self, start: usize, rows: usize, src: &[Cell]);
}

impl Simulation {
    pub(crate) fn compute_hybrid(
        &mut self,
        max_generations: u32,
        device_rows: usize,
        sync_period: usize,
    ) -> u32 {
        let dim = self.dim;
        // Rows the device has fully settled by the time a sync happens.
        let settled_rows = device_rows - sync_period;
        // Host band starts at the largest tile boundary at or below the
        // settled line, so the two lanes overlap on the border tiles.
        let host_start = settled_rows - settled_rows % self.tile_h;
        let border_hi = (device_rows + sync_period).min(dim);
        let (tile_w, tile_h, tiles_x) = (self.tile_w, self.tile_h, self.tiles_x);
        let host_ty0 = host_start / tile_h;
        let host_tile_count = tiles_x * ((dim - host_start) / tile_h);

        let mut accelerator = match self.accelerator.take() {
            Some(acc) => acc,
            None => panic!(
                "hybrid strategy requires an attached accelerator; call attach_accelerator first"
            ),
        };
        if !self.band_uploaded {
            accelerator.upload(self.grid.current());
            self.band_uploaded = true;
        }

        // Sync cadence keys off the persistent counter, not the per-call
        // index, so the staleness window never stretches across calls.
        let base_generation = self.generation;

        let mut converged_at = 0;
        for generation in 1..=max_generations {
            let (current, next) = self.grid.current_and_next_mut();
            let src = SendConstPtr::new(current.as_ptr());
            let dst = SendPtr::new(next.as_mut_ptr());
            let acc = &mut accelerator;
            let (device_changed, host_changed) = self.pool.install(|| {
                rayon::join(
                    || acc.advance(),
                    || {
                        (0..host_tile_count)
                            .into_par_iter()
                            .map(move |idx| {
                                let tx = idx % tiles_x;
                                let ty = host_ty0 + idx / tiles_x;
                                let region = Region {
                                    x: tx * tile_w,
                                    y: ty * tile_h,
                                    w: tile_w,
                                    h: tile_h,
                                };
                                unsafe { step_region_raw(src.get(), dst.get(), dim, region) }
                            })
                            .reduce(|| false, |a, b| a | b)
                    },
                )
            });

            if !(device_changed || host_changed) {
                self.generation += generation as u64;
                converged_at = generation;
                break;
            }
            self.grid.swap();

            if (base_generation + generation as u64) % sync_period as u64 == 0 {
                let current = self.grid.current_mut();
                // Pull the settled device rows into the host grid, then
                // push the host-fresh border band down to the device. The
                // pushed band extends past the device line so the device's
                // own halo rows stay bounded-stale.
                accelerator.read_rows(0, settled_rows, current);
                accelerator.write_rows(settled_rows, border_hi - settled_rows, current);
            }
        }
        if converged_at == 0 {
            self.generation += max_generations as u64;
        }

        // Exit exchange: rows above the host band are only ever written at
        // sync points, and the device border must be fresh when the next
        // call resumes mid-period.
        if host_start > 0 {
            accelerator.read_rows(0, host_start, self.grid.current_mut());
        }
        accelerator.write_rows(settled_rows, border_hi - settled_rows, self.grid.current());
        self.accelerator = Some(accelerator);
        converged_at
    }
}
