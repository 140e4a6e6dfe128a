//! Hybrid-strategy tests using a host-side accelerator stand-in, so the
//! band protocol (upload, advance, border exchange, settled readback) is
//! exercised without a GPU.

use std::sync::{Arc, Mutex};

use lattice_life::grid::Cell;
use lattice_life::kernel::{step_region, Region};
use lattice_life::patterns;
use lattice_life::{Accelerator, SimConfig, Simulation, Strategy};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Inner state of the stand-in accelerator, kept behind a shared handle so
/// tests can inspect device buffers and the border-push log after the
/// accelerator has been attached to a simulation.
struct BandState {
    bufs: [Vec<Cell>; 2],
    phase: usize,
    /// Generations advanced so far.
    advances: u32,
    /// For each border push, the advance count at which it happened.
    pushes: Vec<u32>,
}

/// Double-buffered full-grid accelerator that advances its band with the
/// same kernel the host uses, reporting the exact change flag. Border
/// pushes land in both buffers, mirroring the device protocol.
struct BandAccelerator {
    dim: usize,
    device_rows: usize,
    state: Arc<Mutex<BandState>>,
}

impl BandAccelerator {
    fn new(dim: usize, device_rows: usize) -> Self {
        Self {
            dim,
            device_rows,
            state: Arc::new(Mutex::new(BandState {
                bufs: [vec![0; dim * dim], vec![0; dim * dim]],
                phase: 0,
                advances: 0,
                pushes: Vec::new(),
            })),
        }
    }

    fn state(&self) -> Arc<Mutex<BandState>> {
        self.state.clone()
    }
}

impl Accelerator for BandAccelerator {
    fn upload(&mut self, cells: &[Cell]) {
        let mut state = self.state.lock().unwrap();
        state.bufs[0].copy_from_slice(cells);
        state.bufs[1].copy_from_slice(cells);
        state.phase = 0;
    }

    fn advance(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        let region = Region { x: 0, y: 0, w: self.dim, h: self.device_rows };
        let phase = state.phase;
        let (a, b) = state.bufs.split_at_mut(1);
        let (src, dst) = if phase == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        };
        let changed = step_region(src, dst, self.dim, region);
        state.phase ^= 1;
        state.advances += 1;
        changed
    }

    fn read_rows(&mut self, start: usize, rows: usize, dst: &mut [Cell]) {
        let state = self.state.lock().unwrap();
        let lo = start * self.dim;
        let hi = lo + rows * self.dim;
        dst[lo..hi].copy_from_slice(&state.bufs[state.phase][lo..hi]);
    }

    fn write_rows(&mut self, start: usize, rows: usize, src: &[Cell]) {
        let mut state = self.state.lock().unwrap();
        let lo = start * self.dim;
        let hi = lo + rows * self.dim;
        for buf in &mut state.bufs {
            buf[lo..hi].copy_from_slice(&src[lo..hi]);
        }
        let advances = state.advances;
        state.pushes.push(advances);
    }
}

fn hybrid_sim_with_state(
    dim: usize,
    tile: usize,
    device_rows: usize,
    sync_period: usize,
) -> (Simulation, Arc<Mutex<BandState>>) {
    let mut sim = SimConfig::default()
        .dim(dim)
        .tile(tile, tile)
        .strategy(Strategy::Hybrid { device_rows, sync_period })
        .build()
        .unwrap();
    let accelerator = BandAccelerator::new(dim, device_rows);
    let state = accelerator.state();
    sim.attach_accelerator(Box::new(accelerator));
    (sim, state)
}

fn hybrid_sim(dim: usize, tile: usize, device_rows: usize, sync_period: usize) -> Simulation {
    hybrid_sim_with_state(dim, tile, device_rows, sync_period).0
}

fn sequential_sim(dim: usize, tile: usize) -> Simulation {
    SimConfig::default()
        .dim(dim)
        .tile(tile, tile)
        .strategy(Strategy::Sequential)
        .build()
        .unwrap()
}

#[test]
#[should_panic(expected = "requires an attached accelerator")]
fn hybrid_without_accelerator_panics() {
    let mut sim = SimConfig::default()
        .dim(64)
        .tile(8, 8)
        .strategy(Strategy::Hybrid { device_rows: 32, sync_period: 8 })
        .build()
        .unwrap();
    sim.compute(1);
}

#[test]
fn device_band_activity_matches_sequential() {
    // All activity stays deep inside the device band, far from the
    // border, so the bounded-stale halo never feeds into live cells.
    let dim = 128;
    let mut hybrid = hybrid_sim(dim, 8, 64, 8);
    let mut full = sequential_sim(dim, 8);
    patterns::glider(&mut hybrid, 5, 5);
    patterns::glider(&mut full, 5, 5);

    hybrid.compute(40);
    full.compute(40);
    assert_eq!(hybrid.cells(), full.cells());
}

#[test]
fn host_band_activity_matches_sequential() {
    let dim = 128;
    let mut hybrid = hybrid_sim(dim, 8, 64, 8);
    let mut full = sequential_sim(dim, 8);
    // Activity entirely inside the host band, below the settled line.
    patterns::glider(&mut hybrid, 80, 90);
    patterns::glider(&mut full, 80, 90);

    hybrid.compute(40);
    full.compute(40);
    assert_eq!(hybrid.cells(), full.cells());
}

#[test]
fn still_life_world_converges_under_hybrid() {
    let mut sim = hybrid_sim(64, 8, 32, 8);
    patterns::stable_blocks(&mut sim);
    assert_eq!(sim.compute(20), 1);
}

#[test]
fn border_rows_are_coherent_at_sync_boundaries() {
    // Blinkers straddling nothing but the middle of each band; run an
    // exact multiple of the sync period so the final grid reflects a
    // fresh exchange, then compare band contents to a sequential run.
    let dim = 128;
    let device_rows = 64;
    let sync_period = 8;
    let mut hybrid = hybrid_sim(dim, 8, device_rows, sync_period);
    let mut full = sequential_sim(dim, 8);
    for sim in [&mut hybrid, &mut full] {
        for x in 20..23 {
            sim.set_cell(x, 20, true); // device band
            sim.set_cell(x, 100, true); // host band
        }
    }

    hybrid.compute(16);
    full.compute(16);
    assert_eq!(hybrid.cells(), full.cells());
    assert_eq!(hybrid.population(), 6);
}

#[test]
fn divergence_stays_confined_to_the_border_band() {
    // Activity parked right on the band boundary. Between syncs the two
    // lanes may disagree near the border, but rows far from it must stay
    // bit-identical to a sequential run even at a non-sync generation.
    let dim = 128;
    let device_rows = 64;
    let sync_period = 8;
    let mut hybrid = hybrid_sim(dim, 8, device_rows, sync_period);
    let mut full = sequential_sim(dim, 8);
    for sim in [&mut hybrid, &mut full] {
        for x in 30..33 {
            sim.set_cell(x, 63, true);
        }
        patterns::glider(sim, 5, 5);
        patterns::glider(sim, 80, 100);
    }

    hybrid.compute(13);
    full.compute(13);
    // 13 generations: staleness can have leaked at most sync_period + 5
    // rows away from the boundary in either direction.
    let safe_margin = 24;
    for y in 0..dim {
        if y + safe_margin >= device_rows && y < device_rows + safe_margin {
            continue;
        }
        for x in 0..dim {
            assert_eq!(
                hybrid.get_cell(x, y),
                full.get_cell(x, y),
                "cell ({x},{y}) diverged far from the border band"
            );
        }
    }
}

#[test]
fn accelerator_survives_repeated_compute_calls() {
    let dim = 128;
    let mut hybrid = hybrid_sim(dim, 8, 64, 8);
    let mut full = sequential_sim(dim, 8);
    patterns::glider(&mut hybrid, 5, 5);
    patterns::glider(&mut full, 5, 5);

    for _ in 0..3 {
        hybrid.compute(8);
        full.compute(8);
    }
    assert_eq!(hybrid.cells(), full.cells());
}

#[test]
fn resync_cadence_holds_across_compute_calls() {
    // Two back-to-back calls whose budget is not a multiple of the sync
    // period. Border pushes must stay on the absolute-generation cadence,
    // never more than one period apart.
    let dim = 128;
    let sync_period = 8;
    let (mut hybrid, state) = hybrid_sim_with_state(dim, 8, 64, sync_period);
    // A blinker in the device band keeps both calls from converging.
    for x in 30..33 {
        hybrid.set_cell(x, 20, true);
    }

    hybrid.compute(13);
    hybrid.compute(13);

    let state = state.lock().unwrap();
    assert_eq!(state.advances, 26);
    let pushes = &state.pushes;
    assert!(pushes[0] <= sync_period as u32, "first push at {}", pushes[0]);
    for pair in pushes.windows(2) {
        assert!(
            pair[1] - pair[0] <= sync_period as u32,
            "border push gap {} exceeds the sync period",
            pair[1] - pair[0]
        );
    }
    for expected in [8, 16, 24] {
        assert!(pushes.contains(&expected), "missing periodic push at generation {expected}");
    }
}

#[test]
fn border_rows_match_host_right_after_a_resync() {
    // Oscillators on both sides of the settled line keep the exchange
    // band busy; after a generation count that lands on a sync, the
    // device's settled and border rows must equal the host grid cell for
    // cell.
    let dim = 128;
    let device_rows = 64;
    let sync_period = 8;
    let (mut hybrid, state) = hybrid_sim_with_state(dim, 8, device_rows, sync_period);
    for x in [20, 40, 60] {
        for dx in 0..3 {
            hybrid.set_cell(x + dx, 58, true);
            hybrid.set_cell(x + dx, 66, true);
        }
    }

    hybrid.compute(sync_period as u32);

    let state = state.lock().unwrap();
    let device = &state.bufs[state.phase];
    let settled = device_rows - sync_period;
    let border_hi = device_rows + sync_period;
    assert_eq!(
        &device[..settled * dim],
        &hybrid.cells()[..settled * dim],
        "settled device rows diverged from the host grid"
    );
    assert_eq!(
        &device[settled * dim..border_hi * dim],
        &hybrid.cells()[settled * dim..border_hi * dim],
        "border rows diverged right after an exchange"
    );
}

#[test]
fn host_lane_matches_sequential_across_threads() {
    // Dense soup filling the whole host band, run on a multi-thread pool,
    // with enough distance from the settled line that no staleness can
    // reach the activity within the budget.
    let dim = 128;
    let mut hybrid = SimConfig::default()
        .dim(dim)
        .tile(8, 8)
        .strategy(Strategy::Hybrid { device_rows: 64, sync_period: 8 })
        .thread_count(4)
        .build()
        .unwrap();
    hybrid.attach_accelerator(Box::new(BandAccelerator::new(dim, 64)));
    let mut full = sequential_sim(dim, 8);
    let mut rng = StdRng::seed_from_u64(4242);
    for y in 80..120 {
        for x in 1..dim - 1 {
            if rng.next_u64() % 2 == 0 {
                hybrid.set_cell(x, y, true);
                full.set_cell(x, y, true);
            }
        }
    }

    hybrid.compute(20);
    full.compute(20);
    assert_eq!(hybrid.cells(), full.cells());
}
