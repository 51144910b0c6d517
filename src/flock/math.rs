// Vector helpers shared by the aggregation and steering phases.

use glam::Vec3;
use rand::Rng;

/// Squared-length threshold below which a vector is treated as degenerate.
/// Corresponds to an actual length of roughly 0.0316.
pub const NORMALIZE_EPSILON_SQ: f32 = 1e-3;

/// Scale `v` to length `scale`, or return `(0, 0, scale)` when `v` is too
/// short to normalize.
///
/// The fallback keeps isolated agents (and agents whose forces cancel out)
/// drifting along +Z instead of producing NaN, which would otherwise feed
/// forward into every later frame.
#[inline]
pub fn safe_normalize(v: Vec3, scale: f32) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq >= NORMALIZE_EPSILON_SQ {
        v * (scale / len_sq.sqrt())
    } else {
        Vec3::new(0.0, 0.0, scale)
    }
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    // Archimedes: uniform z and uniform azimuth give a uniform sphere.
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// True when every component of `v` is finite.
#[inline]
pub fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
