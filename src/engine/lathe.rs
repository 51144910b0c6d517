// Lathe: revolve a 2D profile around the Z axis into a closed PolyMesh.
//
// The profile runs from the nose (largest Z) to the tail (smallest Z). Each
// point gives an elliptical cross-section, so a fish can be narrower than it
// is tall. Ends with zero radius collapse to a single pole vertex; ends with
// a real radius are closed with one n-gon.

use glam::{Vec2, Vec3};

use super::mesh::PolyMesh;

/// One cross-section of a lathed body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub z: f32,
    /// Half-width (x) and half-height (y) of the cross-section.
    pub radius: Vec2,
}

impl ProfilePoint {
    pub const fn new(z: f32, rx: f32, ry: f32) -> Self {
        Self { z, radius: Vec2::new(rx, ry) }
    }

    fn is_pole(&self) -> bool {
        self.radius.max_element() <= 1e-6
    }
}

/// Revolve `profile` with `segments` vertices per ring.
pub fn lathe(profile: &[ProfilePoint], segments: u32) -> PolyMesh {
    assert!(profile.len() >= 2, "a lathe profile needs at least two points");
    assert!(segments >= 3, "a ring needs at least three segments");

    let mut mesh = PolyMesh::new();
    let n = segments;

    let first = profile[0];
    let last = profile[profile.len() - 1];
    let nose_pole = first.is_pole().then(|| mesh.add_vertex(Vec3::new(0.0, 0.0, first.z)));
    let tail_pole = last.is_pole().then(|| mesh.add_vertex(Vec3::new(0.0, 0.0, last.z)));

    let ring_points: Vec<&ProfilePoint> = profile
        .iter()
        .enumerate()
        .filter(|&(i, p)| {
            let end = i == 0 || i == profile.len() - 1;
            !(end && p.is_pole())
        })
        .map(|(_, p)| p)
        .collect();
    assert!(!ring_points.is_empty(), "a lathe profile needs at least one ring");

    let rings: Vec<u32> = ring_points
        .iter()
        .map(|p| {
            let base = mesh.vertex_count() as u32;
            for j in 0..n {
                let theta = std::f32::consts::TAU * j as f32 / n as f32;
                mesh.add_vertex(Vec3::new(
                    p.radius.x * theta.cos(),
                    p.radius.y * theta.sin(),
                    p.z,
                ));
            }
            base
        })
        .collect();

    let at = |ring: u32, j: u32| ring + j % n;

    // Side quads, wound outward.
    for pair in rings.windows(2) {
        let (front, back) = (pair[0], pair[1]);
        for j in 0..n {
            mesh.add_face(vec![at(front, j), at(back, j), at(back, j + 1), at(front, j + 1)]);
        }
    }

    let front_ring = rings[0];
    let back_ring = rings[rings.len() - 1];

    match nose_pole {
        Some(pole) => {
            for j in 0..n {
                mesh.add_face(vec![pole, at(front_ring, j), at(front_ring, j + 1)]);
            }
        }
        None => mesh.add_face((0..n).map(|j| at(front_ring, j)).collect()),
    }

    match tail_pole {
        Some(pole) => {
            for j in 0..n {
                mesh.add_face(vec![pole, at(back_ring, j + 1), at(back_ring, j)]);
            }
        }
        None => mesh.add_face((0..n).rev().map(|j| at(back_ring, j)).collect()),
    }

    mesh
}

/// Fish body profile, nose at `+length / 2`, tail fin at `-length / 2`.
///
/// The peduncle pinches in just before the tail, then the fin flares out
/// vertically while staying almost flat horizontally.
pub fn fish_profile(length: f32) -> Vec<ProfilePoint> {
    const UNIT: [(f32, f32, f32); 10] = [
        (0.50, 0.000, 0.000),
        (0.44, 0.045, 0.060),
        (0.32, 0.085, 0.125),
        (0.12, 0.100, 0.150),
        (-0.08, 0.080, 0.120),
        (-0.22, 0.045, 0.065),
        (-0.31, 0.020, 0.030),
        (-0.36, 0.012, 0.075),
        (-0.44, 0.008, 0.140),
        (-0.50, 0.004, 0.170),
    ];
    UNIT.iter()
        .map(|&(z, rx, ry)| ProfilePoint::new(z * length, rx * length, ry * length))
        .collect()
}

/// Closed fish mesh ready for `triangulate_smooth`.
pub fn fish_mesh(length: f32, segments: u32) -> PolyMesh {
    lathe(&fish_profile(length), segments)
}
