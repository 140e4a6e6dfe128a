//! Per-tile change tracking for the lazy drivers.
//!
//! One flag per tile, stored in an arena padded with a one-tile sentinel
//! ring on every side. Marking any neighbor of an edge tile therefore writes
//! unconditionally, without bounds checks, into a slot that is never
//! scheduled for computation. Callers use plain tile coordinates; the +1
//! offset never leaks.
//!
//! Flags are atomics because concurrent tiles may mark the same neighbor in
//! the same generation. Every concurrent writer stores the same value
//! (true), so relaxed ordering is sufficient; flags are only cleared by the
//! tile that owns them.

use std::sync::atomic::{AtomicBool, Ordering};

/// Double-buffered dirty-flag arena, swapped together with the cell buffers.
pub struct DirtyMap {
    tiles_x: usize,
    tiles_y: usize,
    stride: usize,
    flags: [Box<[AtomicBool]>; 2],
    phase: u8,
}

impl DirtyMap {
    /// All real tiles start dirty in the current buffer: every tile must be
    /// evaluated at least once. Sentinel slots start clear and stay
    /// unscheduled forever.
    pub fn new(tiles_x: usize, tiles_y: usize) -> Self {
        let stride = tiles_x + 2;
        let len = stride * (tiles_y + 2);
        let fill = |initial: bool| -> Box<[AtomicBool]> {
            (0..len).map(|_| AtomicBool::new(initial)).collect()
        };
        let map = Self {
            tiles_x,
            tiles_y,
            stride,
            flags: [fill(false), fill(false)],
            phase: 0,
        };
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                map.flags[0][map.slot(tx, ty)].store(true, Ordering::Relaxed);
            }
        }
        map
    }

    #[inline]
    fn slot(&self, tx: usize, ty: usize) -> usize {
        (ty + 1) * self.stride + (tx + 1)
    }

    #[inline]
    fn current(&self) -> &[AtomicBool] {
        &self.flags[self.phase as usize]
    }

    #[inline]
    fn next(&self) -> &[AtomicBool] {
        &self.flags[1 - self.phase as usize]
    }

    #[inline]
    pub fn is_dirty(&self, tx: usize, ty: usize) -> bool {
        self.current()[self.slot(tx, ty)].load(Ordering::Relaxed)
    }

    /// Clear a stable tile's own flag in the current buffer. Not propagated:
    /// a stable tile is re-examined only when a neighbor reactivates it.
    #[inline]
    pub fn clear(&self, tx: usize, ty: usize) {
        self.current()[self.slot(tx, ty)].store(false, Ordering::Relaxed);
    }

    /// Re-arm a changed tile and its full 3×3 neighborhood in the next
    /// buffer. Monotonic set-to-true: idempotent and commutative, so any
    /// number of tiles may mark the same slot concurrently.
    #[inline]
    pub fn mark_neighborhood(&self, tx: usize, ty: usize) {
        let next = self.next();
        let center = self.slot(tx, ty);
        for row in [center - self.stride, center, center + self.stride] {
            next[row - 1].store(true, Ordering::Relaxed);
            next[row].store(true, Ordering::Relaxed);
            next[row + 1].store(true, Ordering::Relaxed);
        }
    }

    /// Swap the two flag buffers. The retiring current buffer is *not*
    /// cleared: a stale flag carried over is either legitimately re-armed by
    /// the tile's next change or cleared by its next no-change evaluation.
    #[inline]
    pub fn swap(&mut self) {
        self.phase ^= 1;
    }

    /// Number of dirty real tiles in the current buffer.
    pub fn dirty_count(&self) -> usize {
        let mut count = 0;
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                count += self.is_dirty(tx, ty) as usize;
            }
        }
        count
    }
}
