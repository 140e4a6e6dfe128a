//! Per-region update kernel for the B3/S23 rule.
//!
//! The only place the Life rule is evaluated. The kernel reads "current",
//! writes the interior cells of its region into "next", and reports whether
//! any of them changed. It never touches cells outside its region and never
//! allocates, which is what makes it safe to run concurrently over disjoint
//! tiles.

use crate::grid::Cell;

/// Rectangular sub-region of the grid, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Region {
    #[inline]
    pub fn full(dim: usize) -> Self {
        Self { x: 0, y: 0, w: dim, h: dim }
    }
}

/// Advance one region by one generation.
///
/// The region is clipped to the grid interior `[1, dim-1)` on both axes, so
/// the outermost ring is read but never written. Branchless: the new state
/// is `(me & (n==2 | n==3)) | (!me & (n==3))` over 0/1 cell values.
///
/// # Safety
/// `current` and `next` must each be valid for `dim * dim` cells, and the
/// caller must ensure exclusive write access to the interior of `region` in
/// `next`. Disjoint regions may be processed concurrently.
pub unsafe fn step_region_raw(
    current: *const Cell,
    next: *mut Cell,
    dim: usize,
    region: Region,
) -> bool {
    let x_start = region.x.max(1);
    let y_start = region.y.max(1);
    let x_end = (region.x + region.w).min(dim - 1);
    let y_end = (region.y + region.h).min(dim - 1);

    let mut change: Cell = 0;
    let mut y = y_start;
    while y < y_end {
        let row = y * dim;
        let mut x = x_start;
        while x < x_end {
            unsafe {
                let i = row + x;
                let me = *current.add(i);
                let n = *current.add(i - dim - 1)
                    + *current.add(i - dim)
                    + *current.add(i - dim + 1)
                    + *current.add(i - 1)
                    + *current.add(i + 1)
                    + *current.add(i + dim - 1)
                    + *current.add(i + dim)
                    + *current.add(i + dim + 1);
                let new_me = (me & ((n == 2) as Cell | (n == 3) as Cell))
                    | ((me ^ 1) & (n == 3) as Cell);
                change |= me ^ new_me;
                *next.add(i) = new_me;
            }
            x += 1;
        }
        y += 1;
    }
    change != 0
}

/// Safe wrapper used by the serial drivers and by tests.
pub fn step_region(current: &[Cell], next: &mut [Cell], dim: usize, region: Region) -> bool {
    assert_eq!(current.len(), dim * dim);
    assert_eq!(next.len(), dim * dim);
    unsafe { step_region_raw(current.as_ptr(), next.as_mut_ptr(), dim, region) }
}
