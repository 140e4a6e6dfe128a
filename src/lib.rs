//! Tiled Conway's Game of Life engine (B3/S23) with interchangeable
//! execution strategies, from a single-threaded whole-grid sweep to a
//! hybrid CPU/GPU split with periodic border resynchronization.

pub mod dirty;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod hybrid;
pub mod kernel;
pub mod patterns;
mod strategy;

pub use engine::{ChunkPolicy, SimConfig, Simulation, Strategy, ALIVE_COLOR, DEAD_COLOR};
pub use error::Error;
pub use gpu::GpuAccelerator;
pub use hybrid::Accelerator;
