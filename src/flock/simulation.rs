// FlockSimulation owns the agent arrays and runs one frame at a time:
//
//   targets(t) -> clear hash -> insert -> aggregate cells -> steer and move
//
// Agent arrays are struct-of-arrays, allocated once and never resized, so
// the position and heading buffers can be handed to the GPU as-is.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::aggregate::{CellAggregate, aggregate_cells};
use super::config::{FlockConfig, SteeringWeights};
use super::error::{FlockError, Result};
use super::executor::ParallelExecutor;
use super::math::{is_finite, random_unit_vector};
use super::spatial_hash::SpatialHash;
use super::steering::steer_and_move;
use super::targets::update_targets;

pub struct FlockSimulation {
    config: FlockConfig,
    /// Live weights; start out as `config.weights`.
    weights: SteeringWeights,
    seed: u64,
    frame: u64,

    positions: Vec<Vec3>,
    headings: Vec<Vec3>,
    speeds: Vec<f32>,
    cell_index: Vec<u32>,

    hash: SpatialHash,
    cells: Vec<CellAggregate>,
    targets: Vec<Vec3>,
    executor: ParallelExecutor,
}

impl FlockSimulation {
    /// Spawn `config.agent_count` agents at random positions, headings and
    /// speeds.
    ///
    /// With `config.seed` set, two simulations built from the same config
    /// and fed the same time steps evolve identically.
    pub fn new(config: FlockConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let n = config.agent_count;
        let e = config.spawn_extent;

        let mut positions = Vec::with_capacity(n);
        let mut headings = Vec::with_capacity(n);
        let mut speeds = Vec::with_capacity(n);
        for _ in 0..n {
            positions.push(Vec3::new(
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
            ));
            headings.push(random_unit_vector(&mut rng));
            speeds.push(rng.gen_range(config.speed_min..=config.speed_max));
        }

        Self::assemble(config, seed, positions, headings, speeds)
    }

    /// Build a simulation from explicit agent state.
    ///
    /// `config.agent_count` is replaced by the length of the arrays, which
    /// must all match. `config.seed` is recorded but not used for spawning.
    pub fn from_state(
        mut config: FlockConfig,
        positions: Vec<Vec3>,
        headings: Vec<Vec3>,
        speeds: Vec<f32>,
    ) -> Result<Self> {
        if positions.len() != headings.len() || positions.len() != speeds.len() {
            return Err(FlockError::InvalidConfig(format!(
                "agent state arrays differ in length: {} positions, {} headings, {} speeds",
                positions.len(),
                headings.len(),
                speeds.len()
            )));
        }
        config.agent_count = positions.len();
        config.validate()?;
        if !positions.iter().chain(&headings).all(|v| is_finite(*v))
            || !speeds.iter().all(|s| s.is_finite())
        {
            return Err(FlockError::InvalidConfig("agent state must be finite".into()));
        }

        let seed = config.seed.unwrap_or(0);
        Self::assemble(config, seed, positions, headings, speeds)
    }

    fn assemble(
        config: FlockConfig,
        seed: u64,
        positions: Vec<Vec3>,
        headings: Vec<Vec3>,
        speeds: Vec<f32>,
    ) -> Result<Self> {
        let executor = ParallelExecutor::new(config.threads)?;
        let n = positions.len();
        Ok(Self {
            weights: config.weights,
            seed,
            frame: 0,
            positions,
            headings,
            speeds,
            cell_index: vec![0; n],
            hash: SpatialHash::new(),
            cells: Vec::new(),
            targets: Vec::with_capacity(config.targets.len()),
            executor,
            config,
        })
    }

    /// Advance the simulation by `dt` seconds at world time `world_time`.
    ///
    /// Blocks until both parallel phases have joined, so every buffer
    /// accessor sees a complete frame afterwards.
    pub fn simulate(&mut self, dt: f32, world_time: f64) {
        update_targets(&self.config.targets, world_time, &mut self.targets);
        let weights = self.effective_weights(world_time);

        self.hash.clear();
        self.hash.insert(self.config.cell_radius, &self.positions);

        aggregate_cells(
            &self.executor,
            &self.hash,
            &self.positions,
            &self.headings,
            &self.targets,
            &mut self.cells,
            &mut self.cell_index,
        );

        let cell_count = self.hash.cell_count();
        steer_and_move(
            &self.executor,
            &mut self.positions,
            &mut self.headings,
            &self.speeds,
            &self.cell_index,
            &self.cells[..cell_count],
            &weights,
            dt,
        );

        self.frame += 1;

        if cfg!(debug_assertions) {
            if let Some(i) = self.check_finite() {
                panic!(
                    "agent {i} went non-finite on frame {}: position {:?}, heading {:?}",
                    self.frame, self.positions[i], self.headings[i]
                );
            }
        }
    }

    /// Weights used for a frame at world time `t`, with breathing applied
    /// to the target weight.
    pub fn effective_weights(&self, t: f64) -> SteeringWeights {
        SteeringWeights {
            target: self.weights.target * self.config.breathing.factor(t),
            ..self.weights
        }
    }

    /// Index of the first agent with a NaN or infinite component.
    pub fn check_finite(&self) -> Option<usize> {
        self.positions
            .iter()
            .zip(&self.headings)
            .position(|(p, h)| !is_finite(*p) || !is_finite(*h))
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn headings(&self) -> &[Vec3] {
        &self.headings
    }

    /// Positions as tightly packed `[f32; 3]` bytes for an instance buffer.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Headings as tightly packed `[f32; 3]` bytes for an instance buffer.
    pub fn heading_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.headings)
    }

    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    /// Dense cell index of every agent as of the last frame.
    pub fn cell_indices(&self) -> &[u32] {
        &self.cell_index
    }

    /// Aggregates for the cells occupied in the last frame.
    pub fn cells(&self) -> &[CellAggregate] {
        &self.cells[..self.hash.cell_count()]
    }

    pub fn cell_count(&self) -> usize {
        self.hash.cell_count()
    }

    pub fn largest_cell(&self) -> usize {
        self.hash.largest_bucket()
    }

    /// Targets used by the last frame.
    pub fn targets(&self) -> &[Vec3] {
        &self.targets
    }

    pub fn agent_count(&self) -> usize {
        self.positions.len()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seed the agents were spawned from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn workers(&self) -> usize {
        self.executor.workers()
    }

    pub fn weights(&self) -> SteeringWeights {
        self.weights
    }

    /// Retune the steering weights. Negative or non-finite values are
    /// clamped to zero.
    pub fn set_weights(&mut self, weights: SteeringWeights) {
        let clean = |w: f32| if w.is_finite() { w.max(0.0) } else { 0.0 };
        self.weights = SteeringWeights {
            separation: clean(weights.separation),
            alignment: clean(weights.alignment),
            target: clean(weights.target),
        };
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flock::config::{Breathing, TargetPattern};

    fn small_config() -> FlockConfig {
        FlockConfig {
            agent_count: 300,
            threads: Some(2),
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn spawn_respects_config() {
        let config = small_config();
        let sim = FlockSimulation::new(config.clone()).unwrap();
        assert_eq!(sim.agent_count(), 300);
        assert_eq!(sim.seed(), 42);
        for ((p, h), s) in sim.positions().iter().zip(sim.headings()).zip(sim.speeds()) {
            assert!(p.abs().max_element() <= config.spawn_extent);
            assert!((h.length() - 1.0).abs() < 1e-5);
            assert!((config.speed_min..=config.speed_max).contains(s));
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = FlockConfig { cell_radius: -1.0, ..small_config() };
        assert!(matches!(FlockSimulation::new(config), Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn from_state_checks_lengths() {
        let err = FlockSimulation::from_state(
            small_config(),
            vec![Vec3::ZERO; 2],
            vec![Vec3::X; 3],
            vec![1.0; 2],
        );
        assert!(matches!(err, Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn from_state_rejects_nan() {
        let err = FlockSimulation::from_state(
            small_config(),
            vec![Vec3::new(f32::NAN, 0.0, 0.0)],
            vec![Vec3::X],
            vec![1.0],
        );
        assert!(matches!(err, Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn simulate_updates_bookkeeping() {
        let mut sim = FlockSimulation::new(small_config()).unwrap();
        sim.simulate(1.0 / 60.0, 0.0);
        assert_eq!(sim.frame(), 1);
        assert_eq!(sim.targets().len(), 3);
        assert!(sim.cell_count() > 0);
        assert_eq!(sim.cells().len(), sim.cell_count());
        let members: u32 = sim.cells().iter().map(|c| c.members).sum();
        assert_eq!(members as usize, sim.agent_count());
        for (i, &c) in sim.cell_indices().iter().enumerate() {
            assert!((c as usize) < sim.cell_count(), "agent {i} has stale cell {c}");
        }
    }

    #[test]
    fn buffers_are_tightly_packed() {
        let sim = FlockSimulation::new(small_config()).unwrap();
        assert_eq!(sim.position_bytes().len(), sim.agent_count() * 12);
        assert_eq!(sim.heading_bytes().len(), sim.agent_count() * 12);
        let first: &[f32] = bytemuck::cast_slice(&sim.position_bytes()[..12]);
        assert_eq!(first, sim.positions()[0].to_array());
    }

    #[test]
    fn breathing_modulates_only_the_target_weight() {
        let config = FlockConfig {
            breathing: Breathing { amplitude: 0.5, period_secs: 4.0 },
            ..small_config()
        };
        let sim = FlockSimulation::new(config).unwrap();
        let base = sim.weights();
        let w = sim.effective_weights(1.0);
        assert_eq!(w.separation, base.separation);
        assert_eq!(w.alignment, base.alignment);
        assert!((w.target - base.target * 1.5).abs() < 1e-5);
    }

    #[test]
    fn set_weights_clamps() {
        let mut sim = FlockSimulation::new(small_config()).unwrap();
        sim.set_weights(SteeringWeights { separation: -2.0, alignment: f32::NAN, target: 3.0 });
        assert_eq!(sim.weights(), SteeringWeights { separation: 0.0, alignment: 0.0, target: 3.0 });
    }

    #[test]
    fn static_targets_are_reported() {
        let config = FlockConfig {
            targets: TargetPattern::Static(vec![Vec3::new(1.0, 2.0, 3.0)]),
            ..small_config()
        };
        let mut sim = FlockSimulation::new(config).unwrap();
        sim.simulate(0.01, 5.0);
        assert_eq!(sim.targets(), &[Vec3::new(1.0, 2.0, 3.0)]);
        assert!(sim.cells().iter().all(|c| c.target == Vec3::new(1.0, 2.0, 3.0)));
    }
}
