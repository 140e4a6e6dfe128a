//! Simulation front-end: configuration, strategy dispatch, and the cell
//! accessors exposed to seeding and rendering collaborators.

use crate::dirty::DirtyMap;
use crate::error::Error;
use crate::grid::{Cell, GridStore};
use crate::hybrid::Accelerator;

/// Two-color palette for the render-refresh hook (0x00RRGGBB).
pub const DEAD_COLOR: u32 = 0x0000_0000;
pub const ALIVE_COLOR: u32 = 0x00FF_FF00;

/// Scheduling policy for the data-parallel drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkPolicy {
    /// Let the scheduler pick (rayon's default splitting).
    Auto,
    /// One contiguous chunk per worker.
    Static,
    /// Fixed-size stealable chunks of the given tile count.
    Dynamic(usize),
}

/// Execution strategy, selected at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One whole-grid kernel call per generation.
    Sequential,
    /// One kernel call per tile, row-major.
    Tiled,
    /// Tiles distributed across the pool, OR-reduced change flags.
    ParallelFor { chunk: ChunkPolicy },
    /// Parallel-for that skips clean tiles and drives the dirty tracker.
    LazyParallelFor { chunk: ChunkPolicy },
    /// Tiles grouped into tasks of `grain` tiles, joined at a group barrier.
    TaskGroup { grain: usize },
    /// Accelerator band + host band, resynchronized every `sync_period`
    /// generations. Requires an attached [`Accelerator`].
    Hybrid { device_rows: usize, sync_period: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::ParallelFor { chunk: ChunkPolicy::Auto }
    }
}

/// Configuration for a [`Simulation`].
///
/// Use `SimConfig::default()` for auto-tuned defaults, or customise
/// individual knobs via the builder methods.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Grid dimension (square, fixed for the run).
    pub dim: usize,
    /// Tile width; must evenly divide `dim`.
    pub tile_w: usize,
    /// Tile height; must evenly divide `dim`.
    pub tile_h: usize,
    pub strategy: Strategy,
    /// Number of threads for the compute pool.
    /// `None` means auto-detect (physical cores, capped).
    pub thread_count: Option<usize>,
    /// Hard upper bound on threads regardless of auto-detection.
    pub max_threads: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dim: 512,
            tile_w: 32,
            tile_h: 32,
            strategy: Strategy::default(),
            thread_count: None,
            max_threads: None,
        }
    }
}

impl SimConfig {
    pub fn dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn tile(mut self, tile_w: usize, tile_h: usize) -> Self {
        self.tile_w = tile_w;
        self.tile_h = tile_h;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set an explicit thread count for the compute pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    /// Set a hard upper bound on threads.
    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = Some(n.max(1));
        self
    }

    pub fn build(self) -> Result<Simulation, Error> {
        Simulation::with_config(self)
    }
}

#[inline]
fn auto_pool_thread_count_for_physical(physical: usize) -> usize {
    let physical = physical.max(1);
    if physical <= 8 {
        physical
    } else {
        physical.div_ceil(2).max(6)
    }
}

/// Resolve the thread count from a config, falling back to auto-detect.
fn resolve_thread_count(config: &SimConfig) -> usize {
    let mut threads = config
        .thread_count
        .unwrap_or_else(|| auto_pool_thread_count_for_physical(num_cpus::get_physical()));
    if let Some(cap) = config.max_threads {
        threads = threads.min(cap);
    }
    threads.max(1)
}

pub struct Simulation {
    pub(crate) dim: usize,
    pub(crate) tile_w: usize,
    pub(crate) tile_h: usize,
    pub(crate) tiles_x: usize,
    pub(crate) tiles_y: usize,
    pub(crate) strategy: Strategy,
    pub(crate) grid: GridStore,
    pub(crate) dirty: DirtyMap,
    pub(crate) pool: rayon::ThreadPool,
    pub(crate) generation: u64,
    pub(crate) accelerator: Option<Box<dyn Accelerator>>,
    /// Whether the accelerator band has been seeded from the host grid.
    pub(crate) band_uploaded: bool,
}

impl Simulation {
    pub fn new(dim: usize, tile_w: usize, tile_h: usize) -> Result<Self, Error> {
        SimConfig::default().dim(dim).tile(tile_w, tile_h).build()
    }

    pub fn with_config(config: SimConfig) -> Result<Self, Error> {
        let (dim, tile_w, tile_h) = (config.dim, config.tile_w, config.tile_h);
        let strategy = config.strategy;
        if tile_w == 0
            || tile_h == 0
            || dim < 2
            || dim % tile_w != 0
            || dim % tile_h != 0
        {
            return Err(Error::TileMismatch { dim, tile_w, tile_h });
        }
        if let Strategy::Hybrid { device_rows, sync_period } = strategy {
            let aligned = device_rows % tile_h == 0;
            if !aligned
                || device_rows == 0
                || device_rows > dim
                || sync_period == 0
                || sync_period >= device_rows
            {
                return Err(Error::InvalidPartition { device_rows, sync_period });
            }
        }

        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build lattice-life rayon thread pool");

        let tiles_x = dim / tile_w;
        let tiles_y = dim / tile_h;
        Ok(Self {
            dim,
            tile_w,
            tile_h,
            tiles_x,
            tiles_y,
            strategy,
            grid: GridStore::new(dim),
            dirty: DirtyMap::new(tiles_x, tiles_y),
            pool,
            generation: 0,
            accelerator: None,
            band_uploaded: false,
        })
    }

    /// Attach the accelerator lane used by [`Strategy::Hybrid`].
    pub fn attach_accelerator(&mut self, accelerator: Box<dyn Accelerator>) {
        self.accelerator = Some(accelerator);
        self.band_uploaded = false;
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Write accessor for pattern seeders. Call before the first generation.
    #[inline]
    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        self.grid.set_cell(x, y, alive);
    }

    /// Read accessor for rendering and dump collaborators.
    #[inline]
    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.grid.get_cell(x, y)
    }

    pub fn population(&self) -> u64 {
        self.grid.population()
    }

    /// Snapshot of the current buffer, row-major.
    pub fn cells(&self) -> &[Cell] {
        self.grid.current()
    }

    /// Render-refresh hook: map every cell through the fixed two-color
    /// palette into a DIM² image buffer.
    pub fn render_into(&self, img: &mut [u32]) {
        assert_eq!(img.len(), self.dim * self.dim);
        for (pixel, &cell) in img.iter_mut().zip(self.grid.current()) {
            *pixel = if cell == 0 { DEAD_COLOR } else { ALIVE_COLOR };
        }
    }

    /// Run up to `max_generations` generations under the configured
    /// strategy. Returns the 1-based generation index at which the grid
    /// stabilized (no tile changed), or 0 if the budget was exhausted
    /// without stabilizing.
    pub fn compute(&mut self, max_generations: u32) -> u32 {
        match self.strategy {
            Strategy::Sequential => self.compute_sequential(max_generations),
            Strategy::Tiled => self.compute_tiled(max_generations),
            Strategy::ParallelFor { chunk } => self.compute_parallel_for(max_generations, chunk),
            Strategy::LazyParallelFor { chunk } => self.compute_lazy(max_generations, chunk),
            Strategy::TaskGroup { grain } => self.compute_task_group(max_generations, grain),
            Strategy::Hybrid { device_rows, sync_period } => {
                self.compute_hybrid(max_generations, device_rows, sync_period)
            }
        }
    }
}
