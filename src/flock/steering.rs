// Steering rule: blend separation, alignment and target pulls into a new
// heading, then integrate position along it.
//
// Runs in contiguous agent blocks. Each block owns its slice of the
// position and heading arrays; cell aggregates are read-only here.

use glam::Vec3;

use super::aggregate::CellAggregate;
use super::config::SteeringWeights;
use super::executor::ParallelExecutor;
use super::math::safe_normalize;

/// One agent's next `(heading, position)`.
#[inline]
pub fn steer(
    position: Vec3,
    heading: Vec3,
    speed: f32,
    cell: &CellAggregate,
    weights: &SteeringWeights,
    dt: f32,
) -> (Vec3, Vec3) {
    let separation = safe_normalize(position - cell.separation_center, weights.separation);
    let target = safe_normalize(cell.target - position, weights.target);
    let alignment = safe_normalize(cell.alignment - heading, weights.alignment);

    let desired = safe_normalize(separation + alignment + target, 1.0);
    let new_heading = safe_normalize(heading + (desired - heading) * dt, 1.0);
    let new_position = position + new_heading * (speed * dt);
    (new_heading, new_position)
}

/// Advance every agent by `dt` seconds.
///
/// `cell_index[i]` selects agent `i`'s entry in `cells`; it must have been
/// written by the aggregation pass of the same frame.
#[allow(clippy::too_many_arguments)]
pub fn steer_and_move(
    executor: &ParallelExecutor,
    positions: &mut [Vec3],
    headings: &mut [Vec3],
    speeds: &[f32],
    cell_index: &[u32],
    cells: &[CellAggregate],
    weights: &SteeringWeights,
    dt: f32,
) {
    executor.parallel_for_blocks(positions, headings, |range, block_pos, block_head| {
        let speeds = &speeds[range.clone()];
        let cell_index = &cell_index[range];
        for (((pos, head), &speed), &cell) in block_pos
            .iter_mut()
            .zip(block_head.iter_mut())
            .zip(speeds)
            .zip(cell_index)
        {
            let (new_heading, new_position) =
                steer(*pos, *head, speed, &cells[cell as usize], weights, dt);
            *head = new_heading;
            *pos = new_position;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lone_cell(position: Vec3, heading: Vec3, target: Vec3) -> CellAggregate {
        CellAggregate {
            hash: 0,
            alignment: heading,
            separation_center: position,
            target,
            members: 1,
        }
    }

    #[test]
    fn heading_stays_unit_length() {
        let weights = SteeringWeights::default();
        let cell = CellAggregate {
            hash: 0,
            alignment: Vec3::new(0.2, 0.1, -0.3),
            separation_center: Vec3::new(1.0, 1.0, 1.0),
            target: Vec3::new(-5.0, 2.0, 0.0),
            members: 4,
        };
        let (h, _) = steer(Vec3::new(1.2, 0.9, 1.1), Vec3::Y, 1.0, &cell, &weights, 0.016);
        assert!((h.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn moves_along_the_new_heading() {
        let weights = SteeringWeights { separation: 0.0, alignment: 0.0, target: 1.0 };
        let cell = lone_cell(Vec3::ZERO, Vec3::X, Vec3::new(10.0, 0.0, 0.0));
        let (h, p) = steer(Vec3::ZERO, Vec3::X, 2.0, &cell, &weights, 0.5);
        assert_eq!(h, Vec3::X);
        assert!((p - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn balanced_forces_drift_along_z() {
        // Separation, alignment and target all degenerate: the desired
        // heading falls back to +Z instead of NaN.
        let weights = SteeringWeights { separation: 1.0, alignment: 1.0, target: 0.0 };
        let cell = lone_cell(Vec3::ZERO, Vec3::X, Vec3::ZERO);
        let (h, p) = steer(Vec3::ZERO, Vec3::X, 1.0, &cell, &weights, 0.1);
        assert!(h.is_finite() && p.is_finite());
        assert!(h.z > 0.0);
        assert!((h.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn block_update_matches_scalar_rule() {
        let exec = ParallelExecutor::new(Some(3)).unwrap();
        let weights = SteeringWeights::default();
        let cells = [
            CellAggregate {
                hash: 1,
                alignment: Vec3::new(0.0, 0.5, 0.5),
                separation_center: Vec3::new(0.5, 0.5, 0.5),
                target: Vec3::new(4.0, 0.0, 0.0),
                members: 3,
            },
            lone_cell(Vec3::new(9.0, 9.0, 9.0), Vec3::Z, Vec3::ZERO),
        ];
        let mut positions: Vec<Vec3> = (0..10).map(|i| Vec3::splat(i as f32 * 0.1)).collect();
        let mut headings = vec![Vec3::Y; 10];
        let speeds: Vec<f32> = (0..10).map(|i| 1.0 + i as f32 * 0.1).collect();
        let cell_index: Vec<u32> = (0..10).map(|i| (i % 2) as u32).collect();

        let expected: Vec<(Vec3, Vec3)> = (0..10)
            .map(|i| {
                steer(positions[i], headings[i], speeds[i], &cells[cell_index[i] as usize], &weights, 0.02)
            })
            .collect();

        steer_and_move(&exec, &mut positions, &mut headings, &speeds, &cell_index, &cells, &weights, 0.02);

        for i in 0..10 {
            assert_eq!(headings[i], expected[i].0);
            assert_eq!(positions[i], expected[i].1);
        }
    }
}
