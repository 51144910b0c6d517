// ECS systems run once per frame, in order: clock, then simulation.

use std::time::Instant;

use bevy_ecs::prelude::*;

use super::clock::WorldClock;
use super::resources::{Shoal, SimStats};
use crate::flock::FlockSimulation;

/// Frames between periodic stats lines in the debug log.
const STATS_LOG_INTERVAL: u64 = 600;

/// Sample the wall clock for this frame.
pub fn advance_clock(mut clock: ResMut<WorldClock>) {
    if clock.tick() {
        log::warn!(
            "frame {} delta clamped to {:.3}s",
            clock.frame(),
            clock.max_delta()
        );
    }
}

/// Step the shoal with the clock's delta and record timing.
pub fn simulate_flock(clock: Res<WorldClock>, mut shoal: ResMut<Shoal>, mut stats: ResMut<SimStats>) {
    let start = Instant::now();
    shoal.0.simulate(clock.delta(), clock.elapsed());
    let sim = &shoal.0;

    *stats = SimStats {
        simulate_ms: start.elapsed().as_secs_f32() * 1000.0,
        cell_count: sim.cell_count(),
        largest_cell: sim.largest_cell(),
        agent_count: sim.agent_count(),
        frame: sim.frame(),
    };

    if stats.frame % STATS_LOG_INTERVAL == 0 {
        log::debug!(
            "frame {}: {} agents in {} cells (max {}), simulate {:.2} ms",
            stats.frame,
            stats.agent_count,
            stats.cell_count,
            stats.largest_cell,
            stats.simulate_ms
        );
    }
}

/// World holding the shoal, a clock and empty stats.
pub fn build_world(sim: FlockSimulation) -> World {
    let mut world = World::new();
    world.insert_resource(WorldClock::new(sim.config().max_frame_dt));
    world.insert_resource(SimStats {
        agent_count: sim.agent_count(),
        ..Default::default()
    });
    world.insert_resource(Shoal(sim));
    world
}

/// Full per-frame schedule driven by the wall clock.
pub fn frame_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((advance_clock, simulate_flock).chain());
    schedule
}

/// Simulation only; the caller advances `WorldClock` itself.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(simulate_flock);
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flock::FlockConfig;

    fn world() -> World {
        let config = FlockConfig {
            agent_count: 200,
            threads: Some(2),
            seed: Some(3),
            ..Default::default()
        };
        build_world(FlockSimulation::new(config).unwrap())
    }

    #[test]
    fn simulation_schedule_steps_once_per_run() {
        let mut world = world();
        let mut schedule = simulation_schedule();
        for i in 1..=3 {
            world.resource_mut::<WorldClock>().advance_to(i as f64 / 60.0);
            schedule.run(&mut world);
        }
        assert_eq!(world.resource::<Shoal>().0.frame(), 3);
        let stats = *world.resource::<SimStats>();
        assert_eq!(stats.frame, 3);
        assert_eq!(stats.agent_count, 200);
        assert!(stats.cell_count > 0);
        assert!(stats.largest_cell >= 1);
    }

    #[test]
    fn frame_schedule_advances_the_clock() {
        let mut world = world();
        let mut schedule = frame_schedule();
        schedule.run(&mut world);
        schedule.run(&mut world);
        assert_eq!(world.resource::<WorldClock>().frame(), 2);
        assert_eq!(world.resource::<Shoal>().0.frame(), 2);
        assert!(world.resource::<WorldClock>().delta() <= 0.1);
    }
}
