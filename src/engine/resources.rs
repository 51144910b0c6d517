// ECS resources shared between the frame schedule and the renderer.

use bevy_ecs::prelude::*;

use crate::flock::FlockSimulation;

/// The simulated shoal. The renderer only ever reads it through `Res`.
#[derive(Resource)]
pub struct Shoal(pub FlockSimulation);

/// Numbers from the most recent simulation step, for the overlay and logs.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimStats {
    /// Wall time spent in `FlockSimulation::simulate`.
    pub simulate_ms: f32,
    pub cell_count: usize,
    pub largest_cell: usize,
    pub agent_count: usize,
    pub frame: u64,
}
