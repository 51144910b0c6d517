// Per-cell neighbourhood statistics.
//
// One task per occupied cell. Cells are disjoint, so every task writes only
// its own CellAggregate slot while reading the shared agent arrays.

use glam::Vec3;

use super::executor::ParallelExecutor;
use super::spatial_hash::SpatialHash;
use super::targets::nearest_target;

/// Steering inputs shared by every agent in one cell for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellAggregate {
    pub hash: i32,
    /// Mean heading of the members.
    pub alignment: Vec3,
    /// Mean position of the members.
    pub separation_center: Vec3,
    /// Target nearest to `separation_center`.
    pub target: Vec3,
    pub members: u32,
}

/// Statistics for a single cell.
///
/// `members` must be non-empty. With an empty target list the cell targets
/// its own center, which produces no pull.
pub fn summarize_cell(
    hash: i32,
    members: &[u32],
    positions: &[Vec3],
    headings: &[Vec3],
    targets: &[Vec3],
) -> CellAggregate {
    debug_assert!(!members.is_empty(), "cells are only materialized when occupied");

    let mut heading_sum = Vec3::ZERO;
    let mut position_sum = Vec3::ZERO;
    for &i in members {
        heading_sum += headings[i as usize];
        position_sum += positions[i as usize];
    }

    let inv = 1.0 / members.len() as f32;
    let center = position_sum * inv;
    CellAggregate {
        hash,
        alignment: heading_sum * inv,
        separation_center: center,
        target: nearest_target(center, targets).unwrap_or(center),
        members: members.len() as u32,
    }
}

/// Fill `cells[..hash.cell_count()]` and point every agent at its cell.
///
/// `cells` grows to the current cell count and is never shrunk, so a
/// steady-state frame does not allocate. Cell `n` is bucket `n` of `hash`.
pub fn aggregate_cells(
    executor: &ParallelExecutor,
    hash: &SpatialHash,
    positions: &[Vec3],
    headings: &[Vec3],
    targets: &[Vec3],
    cells: &mut Vec<CellAggregate>,
    cell_index: &mut [u32],
) {
    let count = hash.cell_count();
    if cells.len() < count {
        cells.resize(count, CellAggregate::default());
    }

    executor.parallel_for(&mut cells[..count], |slot, cell| {
        *cell = summarize_cell(hash.key(slot), hash.bucket(slot), positions, headings, targets);
    });

    // Membership lists are disjoint, but they index the agent arrays
    // sparsely, so the scatter stays on the calling thread.
    for (slot, (_, members)) in hash.buckets().enumerate() {
        for &i in members {
            cell_index[i as usize] = slot as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn single_member_cell_mirrors_its_agent() {
        let positions = [Vec3::new(1.0, 2.0, 3.0)];
        let headings = [Vec3::new(0.0, 0.6, 0.8)];
        let cell = summarize_cell(7, &[0], &positions, &headings, &[Vec3::X]);
        assert_eq!(cell.alignment, headings[0]);
        assert_eq!(cell.separation_center, positions[0]);
        assert_eq!(cell.target, Vec3::X);
        assert_eq!(cell.members, 1);
        assert_eq!(cell.hash, 7);
    }

    #[test]
    fn means_over_members() {
        let positions = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0)];
        let headings = [Vec3::X, Vec3::Y, Vec3::Z];
        let targets = [Vec3::new(50.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)];
        let cell = summarize_cell(0, &[0, 1], &positions, &headings, &targets);
        assert!(approx(cell.alignment, Vec3::new(0.5, 0.5, 0.0)));
        assert!(approx(cell.separation_center, Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(cell.target, targets[1]);
    }

    #[test]
    fn empty_target_list_targets_the_center() {
        let positions = [Vec3::new(4.0, 4.0, 4.0)];
        let cell = summarize_cell(0, &[0], &positions, &[Vec3::X], &[]);
        assert_eq!(cell.target, positions[0]);
    }

    #[test]
    fn aggregates_every_cell_and_assigns_indices() {
        let exec = ParallelExecutor::new(Some(2)).unwrap();
        let positions = vec![
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(10.5, 0.5, 0.5),
            Vec3::new(0.7, 0.2, 0.9),
            Vec3::new(-3.5, 0.5, 0.5),
        ];
        let headings = vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::X];
        let mut hash = SpatialHash::new();
        hash.insert(1.0, &positions);

        let mut cells = Vec::new();
        let mut cell_index = vec![u32::MAX; positions.len()];
        aggregate_cells(&exec, &hash, &positions, &headings, &[Vec3::ZERO], &mut cells, &mut cell_index);

        assert_eq!(cells.len(), 3);
        assert_eq!(cell_index, vec![0, 1, 0, 2]);
        assert_eq!(cells[0].members, 2);
        assert!(approx(cells[0].separation_center, Vec3::new(0.6, 0.35, 0.7)));
        assert!(approx(cells[0].alignment, Vec3::new(0.5, 0.0, 0.5)));
        assert_eq!(cells[1].alignment, Vec3::Y);
    }

    #[test]
    fn cell_buffer_never_shrinks() {
        let exec = ParallelExecutor::new(Some(2)).unwrap();
        let spread: Vec<Vec3> = (0..20).map(|i| Vec3::new(i as f32 * 5.0, 0.0, 0.0)).collect();
        let headings = vec![Vec3::Z; spread.len()];
        let mut hash = SpatialHash::new();
        let mut cells = Vec::new();
        let mut cell_index = vec![0; spread.len()];

        hash.insert(1.0, &spread);
        aggregate_cells(&exec, &hash, &spread, &headings, &[], &mut cells, &mut cell_index);
        assert_eq!(cells.len(), 20);

        let packed = vec![Vec3::splat(0.5); spread.len()];
        hash.clear();
        hash.insert(1.0, &packed);
        aggregate_cells(&exec, &hash, &packed, &headings, &[], &mut cells, &mut cell_index);
        assert_eq!(hash.cell_count(), 1);
        assert_eq!(cells.len(), 20);
        assert!(cell_index.iter().all(|&c| c == 0));
        assert_eq!(cells[0].members, 20);
    }
}
