// Steering targets: a handful of points every cell can be drawn toward.

use glam::Vec3;

use super::config::TargetPattern;

/// Recompute the target list for world time `t` into `out`.
///
/// `out` keeps its allocation; its length always ends up equal to the
/// pattern's target count.
pub fn update_targets(pattern: &TargetPattern, t: f64, out: &mut Vec<Vec3>) {
    out.clear();
    match pattern {
        TargetPattern::Orbiting(orbits) => out.extend(orbits.iter().map(|o| o.position(t))),
        TargetPattern::Static(points) => out.extend_from_slice(points),
    }
}

/// Target closest to `point` by squared distance.
///
/// On an exact tie the earlier target in the list wins. Returns `None` only
/// for an empty list.
pub fn nearest_target(point: Vec3, targets: &[Vec3]) -> Option<Vec3> {
    let mut best: Option<(f32, Vec3)> = None;
    for &t in targets {
        let d = point.distance_squared(t);
        match best {
            Some((best_d, _)) if d >= best_d => {}
            _ => best = Some((d, t)),
        }
    }
    best.map(|(_, t)| t)
}
