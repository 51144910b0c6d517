// Spatial-hash flocking core.
//
// Per frame: targets from world time -> rehash -> per-cell aggregates
// (parallel over cells) -> steer and move (parallel over agent blocks).

pub mod aggregate;
pub mod config;
pub mod error;
pub mod executor;
pub mod math;
pub mod simulation;
pub mod spatial_hash;
pub mod steering;
pub mod targets;

pub use aggregate::CellAggregate;
pub use config::{Breathing, FlockConfig, Orbit, SteeringWeights, TargetPattern};
pub use error::FlockError;
pub use executor::ParallelExecutor;
pub use simulation::FlockSimulation;
pub use spatial_hash::SpatialHash;
