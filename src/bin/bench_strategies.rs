use std::env;
use std::time::Instant;

use lattice_life::patterns;
use lattice_life::{ChunkPolicy, SimConfig, Simulation, Strategy};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Clone, Debug)]
struct BenchConfig {
    dim: usize,
    tile: usize,
    density: f64,
    warmup: u32,
    iters: u32,
    seed: u64,
    threads: Option<usize>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dim: 2048,
            tile: 32,
            density: 0.42,
            warmup: 3,
            iters: 30,
            seed: 0xA5A5_5EED_7788_1122,
            threads: None,
        }
    }
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
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
            "--density" => {
                if let Some(v) = args.next() {
                    cfg.density = v.parse().expect("--density expects f64");
                }
            }
            "--warmup" => {
                if let Some(v) = args.next() {
                    cfg.warmup = v.parse().expect("--warmup expects u32");
                }
            }
            "--iters" => {
                if let Some(v) = args.next() {
                    cfg.iters = v.parse().expect("--iters expects u32");
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
            "--threads" => {
                if let Some(v) = args.next() {
                    cfg.threads = Some(v.parse().expect("--threads expects usize"));
                }
            }
            other => panic!("unknown arg: {other}"),
        }
    }
    cfg
}

fn build_seeded(cfg: &BenchConfig, strategy: Strategy) -> Simulation {
    let mut config = SimConfig::default()
        .dim(cfg.dim)
        .tile(cfg.tile, cfg.tile)
        .strategy(strategy);
    if let Some(t) = cfg.threads {
        config = config.thread_count(t);
    }
    let mut sim = config.build().unwrap_or_else(|e| panic!("{e}"));
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    patterns::random(&mut sim, cfg.density, &mut rng);
    sim
}

fn run_strategy(cfg: &BenchConfig, name: &str, strategy: Strategy) -> u64 {
    let mut sim = build_seeded(cfg, strategy);
    if cfg.warmup > 0 {
        sim.compute(cfg.warmup);
    }

    let start = Instant::now();
    sim.compute(cfg.iters);
    let elapsed = start.elapsed();

    let total_ms = elapsed.as_secs_f64() * 1000.0;
    let avg_ms = total_ms / cfg.iters as f64;
    let population = sim.population();
    println!("{name}: total_ms={total_ms:.6}, avg_ms={avg_ms:.6}, population={population}");
    population
}

fn main() {
    let cfg = parse_args();
    println!(
        "bench_strategies: dim={} tile={} density={} iters={} seed={:#x}",
        cfg.dim, cfg.tile, cfg.density, cfg.iters, cfg.seed
    );

    let runs = [
        ("seq", Strategy::Sequential),
        ("tiled", Strategy::Tiled),
        ("par-auto", Strategy::ParallelFor { chunk: ChunkPolicy::Auto }),
        ("par-static", Strategy::ParallelFor { chunk: ChunkPolicy::Static }),
        ("lazy", Strategy::LazyParallelFor { chunk: ChunkPolicy::Auto }),
        ("taskgroup", Strategy::TaskGroup { grain: 16 }),
    ];

    let mut populations = Vec::new();
    for (name, strategy) in runs {
        populations.push(run_strategy(&cfg, name, strategy));
    }

    let baseline = populations[0];
    let status = if populations.iter().all(|&p| p == baseline) {
        "MATCH"
    } else {
        "MISMATCH"
    };
    println!("population agreement across strategies: [{status}]");
}
