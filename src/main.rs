#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::Instant;

use lattice_life::patterns;
use lattice_life::{ChunkPolicy, GpuAccelerator, SimConfig, Strategy};
use rand::rngs::StdRng;
use rand::SeedableRng;

const USAGE: &str = "usage: lattice-life [--dim N] [--tile N] [--strategy seq|tiled|par|lazy|taskgroup|hybrid] \
[--chunk auto|static|N] [--grain N] [--device-rows N] [--sync-period N] \
[--threads N] [--max-threads N] [--iters N] \
[--pattern stable|oscil|random|glider|guns] [--density F] [--seed N]";

struct MainArgs {
    dim: usize,
    tile: usize,
    strategy_name: String,
    chunk: ChunkPolicy,
    grain: usize,
    device_rows: Option<usize>,
    sync_period: usize,
    threads: Option<usize>,
    max_threads: Option<usize>,
    iters: u32,
    pattern: String,
    density: f64,
    seed: u64,
}

impl Default for MainArgs {
    fn default() -> Self {
        Self {
            dim: 2048,
            tile: 32,
            strategy_name: "par".to_string(),
            chunk: ChunkPolicy::Auto,
            grain: 16,
            device_rows: None,
            sync_period: 10,
            threads: None,
            max_threads: None,
            iters: 1000,
            pattern: "random".to_string(),
            density: 0.42,
            seed: 0x5EED_1234_ABCD_EF01,
        }
    }
}

fn parse_args() -> MainArgs {
    let mut cfg = MainArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dim" => {
                if let Some(v) = args.next() {
                    cfg.dim = v.parse().expect("--dim expects usize");
                }
            }
            "--tile" => {
                if let Some(v) = args.next() {
                    cfg.tile = v.parse().expect("--tile expects usize");
                }
            }
            "--strategy" => {
                if let Some(v) = args.next() {
                    cfg.strategy_name = v.to_ascii_lowercase();
                }
            }
            "--chunk" => {
                if let Some(v) = args.next() {
                    cfg.chunk = match v.as_str() {
                        "auto" => ChunkPolicy::Auto,
                        "static" => ChunkPolicy::Static,
                        n => ChunkPolicy::Dynamic(
                            n.parse().expect("--chunk expects auto, static, or usize"),
                        ),
                    };
                }
            }
            "--grain" => {
                if let Some(v) = args.next() {
                    cfg.grain = v.parse().expect("--grain expects usize");
                }
            }
            "--device-rows" => {
                if let Some(v) = args.next() {
                    cfg.device_rows = Some(v.parse().expect("--device-rows expects usize"));
                }
            }
            "--sync-period" => {
                if let Some(v) = args.next() {
                    cfg.sync_period = v.parse().expect("--sync-period expects usize");
                }
            }
            "--threads" => {
                if let Some(v) = args.next() {
                    cfg.threads = Some(v.parse().expect("--threads expects usize"));
                }
            }
            "--max-threads" => {
                if let Some(v) = args.next() {
                    cfg.max_threads = Some(v.parse().expect("--max-threads expects usize"));
                }
            }
            "--iters" => {
                if let Some(v) = args.next() {
                    cfg.iters = v.parse().expect("--iters expects u32");
                }
            }
            "--pattern" => {
                if let Some(v) = args.next() {
                    cfg.pattern = v.to_ascii_lowercase();
                }
            }
            "--density" => {
                if let Some(v) = args.next() {
                    cfg.density = v.parse().expect("--density expects f64");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = if let Some(hex) = v.strip_prefix("0x") {
                        u64::from_str_radix(hex, 16).expect("--seed hex parse failed")
                    } else {
                        v.parse().expect("--seed expects u64")
                    };
                }
            }
            other => panic!("unknown argument: {other}\n{USAGE}"),
        }
    }
    cfg
}

fn strategy_for(args: &MainArgs) -> Strategy {
    match args.strategy_name.as_str() {
        "seq" => Strategy::Sequential,
        "tiled" => Strategy::Tiled,
        "par" => Strategy::ParallelFor { chunk: args.chunk },
        "lazy" => Strategy::LazyParallelFor { chunk: args.chunk },
        "taskgroup" => Strategy::TaskGroup { grain: args.grain },
        "hybrid" => Strategy::Hybrid {
            device_rows: args.device_rows.unwrap_or(args.dim / 2),
            sync_period: args.sync_period,
        },
        other => panic!("unknown strategy: {other}\n{USAGE}"),
    }
}

fn main() {
    let args = parse_args();
    let strategy = strategy_for(&args);

    let mut config = SimConfig::default()
        .dim(args.dim)
        .tile(args.tile, args.tile)
        .strategy(strategy);
    if let Some(t) = args.threads {
        config = config.thread_count(t);
    }
    if let Some(t) = args.max_threads {
        config = config.max_threads(t);
    }
    let mut sim = config.build().unwrap_or_else(|e| panic!("{e}"));

    if let Strategy::Hybrid { device_rows, .. } = strategy {
        let acc = GpuAccelerator::new(args.dim, device_rows, args.tile, args.tile)
            .unwrap_or_else(|e| panic!("accelerator setup failed: {e}"));
        println!("GPU: {}", acc.adapter_name);
        sim.attach_accelerator(Box::new(acc));
    }

    match args.pattern.as_str() {
        "stable" => patterns::stable_blocks(&mut sim),
        "oscil" => patterns::oscillators(&mut sim),
        "random" => {
            let mut rng = StdRng::seed_from_u64(args.seed);
            patterns::random(&mut sim, args.density, &mut rng);
        }
        "glider" => patterns::glider(&mut sim, 1, 1),
        "guns" => {
            patterns::gosper_gun(&mut sim, 1, 1).unwrap_or_else(|e| panic!("{e}"));
        }
        other => panic!("unknown pattern: {other}\n{USAGE}"),
    }

    let start_population = sim.population();
    println!(
        "lattice-life: dim={} tile={} strategy={} pattern={} start_pop={}",
        args.dim, args.tile, args.strategy_name, args.pattern, start_population
    );

    let start = Instant::now();
    let converged = sim.compute(args.iters);
    let elapsed = start.elapsed();

    let total_ms = elapsed.as_secs_f64() * 1000.0;
    let ran = if converged > 0 { converged } else { args.iters };
    let avg_ms = total_ms / ran.max(1) as f64;

    if converged > 0 {
        println!("stabilized at generation {converged}");
    } else {
        println!("still active after {} generations", args.iters);
    }
    println!(
        "population = {}, {total_ms:.3} ms total, {avg_ms:.6} ms/iter",
        sim.population()
    );
}
