//! Double-buffered cell storage for the simulation grid.
//!
//! Two same-shaped DIM×DIM buffers hold the "current" (read) and "next"
//! (write) generation; `swap` exchanges their roles in O(1) by flipping a
//! phase bit, never copying cell data. The outermost ring of the grid is a
//! permanently dead boundary: it is a legal read target but no kernel ever
//! writes it, so it stays zero for the lifetime of the store.

/// Life state of one cell. Only the values 0 (dead) and 1 (alive) are ever
/// stored after a kernel invocation.
pub type Cell = u8;

pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;

/// Owned pair of cell buffers with an explicit phase-flip swap.
pub struct GridStore {
    dim: usize,
    bufs: [Vec<Cell>; 2],
    phase: u8,
}

impl GridStore {
    /// Allocate two zeroed DIM² buffers. Allocation failure aborts the
    /// process; the engine cannot run with partial memory.
    pub fn new(dim: usize) -> Self {
        let size = dim * dim;
        Self {
            dim,
            bufs: [vec![DEAD; size], vec![DEAD; size]],
            phase: 0,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn current(&self) -> &[Cell] {
        &self.bufs[self.phase as usize]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut [Cell] {
        &mut self.bufs[self.phase as usize]
    }

    /// Borrow the read buffer and the write buffer at once.
    #[inline]
    pub fn current_and_next_mut(&mut self) -> (&[Cell], &mut [Cell]) {
        let (a, b) = self.bufs.split_at_mut(1);
        if self.phase == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    /// Exchange the roles of the two buffers. O(1), no data is copied.
    #[inline]
    pub fn swap(&mut self) {
        self.phase ^= 1;
    }

    #[inline]
    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.current()[y * self.dim + x] != DEAD
    }

    #[inline]
    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        let dim = self.dim;
        self.current_mut()[y * dim + x] = alive as Cell;
    }

    /// Number of live cells in the current buffer.
    pub fn population(&self) -> u64 {
        self.current().iter().map(|&c| c as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEAD, GridStore};

    #[test]
    fn buffers_start_zeroed() {
        let grid = GridStore::new(16);
        assert!(grid.current().iter().all(|&c| c == DEAD));
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn swap_exchanges_roles_without_copying() {
        let mut grid = GridStore::new(8);
        grid.set_cell(3, 4, true);
        assert!(grid.get_cell(3, 4));

        grid.swap();
        assert!(!grid.get_cell(3, 4), "next buffer must still be zeroed");

        grid.swap();
        assert!(grid.get_cell(3, 4), "swap back must restore the original buffer");
    }

    #[test]
    fn split_borrow_sees_both_buffers() {
        let mut grid = GridStore::new(8);
        grid.set_cell(1, 1, true);
        let (current, next) = grid.current_and_next_mut();
        assert_eq!(current[1 * 8 + 1], 1);
        next[2 * 8 + 2] = 1;
        grid.swap();
        assert!(grid.get_cell(2, 2));
    }
}
