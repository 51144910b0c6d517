// Uniform-grid spatial hash used to approximate "nearby agents".
//
// Every frame the hash is cleared and rebuilt from scratch; nothing is
// patched incrementally. Occupied buckets are materialized into a dense array
// in order of first insertion, so bucket N is also cell N for the aggregation
// phase and the parallel fan-out has a stable, indexable range.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use glam::{IVec3, Vec3};

/// Quantize a world position to integer grid coordinates.
///
/// Uses `floor`, not truncation or rounding, so every point inside the same
/// cube of side `cell_radius` maps to the same coordinate on both sides of
/// the origin.
#[inline]
pub fn quantize(position: Vec3, cell_radius: f32) -> IVec3 {
    (position / cell_radius).floor().as_ivec3()
}

/// Mix three quantized coordinates into one 32-bit bucketing key.
///
/// Collisions are expected; the key is only ever used to group agents inside
/// a single frame and is never persisted.
#[inline]
pub fn hash3d(cell: IVec3) -> i32 {
    let (x, y, z) = (cell.x as u32, cell.y as u32, cell.z as u32);
    let mut h = x;
    h = h.wrapping_add(h.wrapping_mul(397) ^ y);
    h = h.wrapping_add(h.wrapping_mul(397) ^ z);
    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h = h.wrapping_add(h << 15);
    h as i32
}

/// Hash-keyed buckets of agent indices.
///
/// Bucket storage is never released: `clear` only resets lengths, so after a
/// few frames the hash stops allocating entirely.
pub struct SpatialHash {
    /// Key -> dense bucket slot for this frame.
    slots: HashMap<i32, u32>,
    /// Key of each occupied slot, in slot order.
    keys: Vec<i32>,
    /// Bucket storage. Only `buckets[..occupied]` is live.
    buckets: Vec<Vec<u32>>,
    occupied: usize,
}

impl SpatialHash {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            keys: Vec::new(),
            buckets: Vec::new(),
            occupied: 0,
        }
    }

    /// Reset every bucket to empty. Backing storage is kept for reuse.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets[..self.occupied] {
            bucket.clear();
        }
        self.keys.clear();
        self.slots.clear();
        self.occupied = 0;
    }

    /// Bucket every agent by the cell its position falls into.
    ///
    /// Agent `i` is `positions[i]`. Call `clear` first; inserting twice
    /// without clearing places agents in two buckets.
    pub fn insert(&mut self, cell_radius: f32, positions: &[Vec3]) {
        debug_assert!(cell_radius > 0.0, "cell radius must be positive");

        for (i, &pos) in positions.iter().enumerate() {
            let key = hash3d(quantize(pos, cell_radius));
            let slot = match self.slots.entry(key) {
                Entry::Occupied(e) => *e.get() as usize,
                Entry::Vacant(e) => {
                    let slot = self.occupied;
                    e.insert(slot as u32);
                    self.keys.push(key);
                    if slot == self.buckets.len() {
                        self.buckets.push(Vec::new());
                    }
                    self.occupied += 1;
                    slot
                }
            };
            self.buckets[slot].push(i as u32);
        }
    }

    /// Non-empty buckets as `(key, member indices)`, in dense slot order.
    ///
    /// Order follows first insertion. It is deterministic for a given
    /// position array but callers should not rely on it for correctness.
    pub fn buckets(&self) -> impl Iterator<Item = (i32, &[u32])> + '_ {
        self.keys
            .iter()
            .copied()
            .zip(self.buckets[..self.occupied].iter().map(Vec::as_slice))
    }

    /// Members of the bucket with dense index `slot`.
    pub fn bucket(&self, slot: usize) -> &[u32] {
        &self.buckets[..self.occupied][slot]
    }

    /// Hash key of the bucket with dense index `slot`.
    pub fn key(&self, slot: usize) -> i32 {
        self.keys[slot]
    }

    /// Dense slot of the bucket holding `key`, if any agent landed there.
    pub fn slot_of(&self, key: i32) -> Option<usize> {
        self.slots.get(&key).map(|&s| s as usize)
    }

    /// Number of occupied cells this frame.
    pub fn cell_count(&self) -> usize {
        self.occupied
    }

    /// Member count of the fullest bucket this frame.
    pub fn largest_bucket(&self) -> usize {
        self.buckets[..self.occupied]
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Bucket lists ever allocated (high-water mark of `cell_count`).
    pub fn allocated_buckets(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_of(hash: &SpatialHash, agent: u32) -> usize {
        (0..hash.cell_count())
            .find(|&slot| hash.bucket(slot).contains(&agent))
            .expect("agent not bucketed")
    }

    #[test]
    fn same_cube_shares_a_bucket() {
        let positions = vec![
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(1.9, 1.2, 0.5),
            Vec3::new(-0.1, 0.5, 0.5),
            Vec3::new(-1.9, 0.5, 0.5),
        ];
        let mut hash = SpatialHash::new();
        hash.insert(2.0, &positions);

        assert_eq!(bucket_of(&hash, 0), bucket_of(&hash, 1));
        // Negative side floors to -1, not 0.
        assert_ne!(bucket_of(&hash, 0), bucket_of(&hash, 2));
        assert_eq!(bucket_of(&hash, 2), bucket_of(&hash, 3));
    }

    #[test]
    fn quantize_floors_toward_negative_infinity() {
        assert_eq!(quantize(Vec3::new(-0.5, 0.5, 3.99), 1.0), IVec3::new(-1, 0, 3));
        assert_eq!(quantize(Vec3::new(-4.0, 4.0, -4.01), 2.0), IVec3::new(-2, 2, -3));
    }

    #[test]
    fn every_agent_lands_in_exactly_one_bucket() {
        let positions: Vec<Vec3> = (0..200)
            .map(|i| {
                let f = i as f32;
                Vec3::new((f * 0.37).sin() * 9.0, (f * 0.11).cos() * 9.0, f * 0.05 - 5.0)
            })
            .collect();
        let mut hash = SpatialHash::new();
        hash.insert(1.5, &positions);

        let mut seen = vec![0u32; positions.len()];
        for (_, members) in hash.buckets() {
            assert!(!members.is_empty());
            for &m in members {
                seen[m as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn clear_keeps_bucket_storage() {
        let positions: Vec<Vec3> = (0..50).map(|i| Vec3::splat(i as f32 * 3.0)).collect();
        let mut hash = SpatialHash::new();
        hash.insert(1.0, &positions);
        let high_water = hash.allocated_buckets();
        assert_eq!(hash.cell_count(), 50);

        hash.clear();
        assert_eq!(hash.cell_count(), 0);
        assert_eq!(hash.buckets().count(), 0);
        assert_eq!(hash.allocated_buckets(), high_water);

        hash.insert(1.0, &positions[..10]);
        assert_eq!(hash.cell_count(), 10);
        assert_eq!(hash.allocated_buckets(), high_water);
    }

    #[test]
    fn slots_follow_first_insertion_order() {
        let positions = vec![
            Vec3::new(5.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(5.6, 0.0, 0.0),
        ];
        let mut hash = SpatialHash::new();
        hash.insert(1.0, &positions);

        assert_eq!(hash.bucket(0), &[0, 2]);
        assert_eq!(hash.bucket(1), &[1]);
        let key = hash3d(quantize(positions[1], 1.0));
        assert_eq!(hash.slot_of(key), Some(1));
        assert_eq!(hash.key(1), key);
        assert_eq!(hash.largest_bucket(), 2);
    }

    #[test]
    fn hash_spreads_neighbouring_cells() {
        let a = hash3d(IVec3::new(0, 0, 0));
        let b = hash3d(IVec3::new(1, 0, 0));
        let c = hash3d(IVec3::new(0, 1, 0));
        let d = hash3d(IVec3::new(0, 0, 1));
        assert!(a != b && a != c && a != d && b != c && b != d && c != d);
    }
}
