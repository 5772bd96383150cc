//! Rigid-body records and the body arena.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::serde_utils::vec3;

/// Index of a body in its [`BodySet`], stable for the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub usize);

/// Aggregate rigid-body state governing one contiguous set of markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyRecord {
    /// World-space centroid
    #[serde(with = "vec3")]
    pub location: Vec3,
    #[serde(with = "vec3")]
    pub velocity: Vec3,
    #[serde(with = "vec3")]
    pub angular_velocity: Vec3,
    /// Accumulated small-angle rotation (scaled axis), not a full attitude
    #[serde(with = "vec3")]
    pub orientation: Vec3,
    pub radius: f32,
    /// Density relative to the background fluid
    pub density: f32,
    /// First marker id of this body's range
    pub first_marker_id: u64,
    pub marker_count: usize,
    /// Surface volume element carried by each marker
    pub marker_volume: f32,
}

impl BodyRecord {
    /// Whether `id` falls in this body's marker id range.
    pub fn owns_marker_id(&self, id: u64) -> bool {
        id >= self.first_marker_id && id < self.first_marker_id + self.marker_count as u64
    }

    /// Rotation represented by the orientation proxy.
    pub fn rotation(&self) -> Quat {
        Quat::from_scaled_axis(self.orientation)
    }

    /// Rigid-body velocity of the material point at `position`.
    #[inline]
    pub fn surface_velocity(&self, position: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(position - self.location)
    }

    /// Total surface measure represented by the markers (`N * dv`).
    pub fn represented_volume(&self) -> f32 {
        self.marker_volume * self.marker_count as f32
    }
}

/// Index-stable arena of bodies in creation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySet {
    list: Vec<BodyRecord>,
}

impl BodySet {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    /// Append a body and return its id.
    pub fn insert(&mut self, body: BodyRecord) -> BodyId {
        self.list.push(body);
        BodyId(self.list.len() - 1)
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyRecord> {
        self.list.get(id.0)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut BodyRecord> {
        self.list.get_mut(id.0)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        id.0 < self.list.len()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &BodyRecord)> {
        self.list.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut BodyRecord)> {
        self.list.iter_mut().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn as_slice(&self) -> &[BodyRecord] {
        &self.list
    }

    /// Body whose id range contains `marker_id`.
    pub fn find_by_marker_id(&self, marker_id: u64) -> Option<BodyId> {
        self.iter()
            .find(|(_, b)| b.owns_marker_id(marker_id))
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(first: u64, count: usize) -> BodyRecord {
        BodyRecord {
            location: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            orientation: Vec3::ZERO,
            radius: 0.1,
            density: 2.0,
            first_marker_id: first,
            marker_count: count,
            marker_volume: 1e-4,
        }
    }

    #[test]
    fn test_insert_is_index_stable() {
        let mut set = BodySet::new();
        let a = set.insert(body(0, 10));
        let b = set.insert(body(10, 5));
        assert_eq!(a, BodyId(0));
        assert_eq!(b, BodyId(1));
        assert_eq!(set.get(b).unwrap().first_marker_id, 10);
        assert!(!set.contains(BodyId(2)));
    }

    #[test]
    fn test_id_ranges() {
        let mut set = BodySet::new();
        set.insert(body(0, 10));
        set.insert(body(10, 5));
        assert_eq!(set.find_by_marker_id(9), Some(BodyId(0)));
        assert_eq!(set.find_by_marker_id(10), Some(BodyId(1)));
        assert_eq!(set.find_by_marker_id(15), None);
    }

    #[test]
    fn test_surface_velocity() {
        let mut b = body(0, 1);
        b.velocity = Vec3::new(1.0, 0.0, 0.0);
        b.angular_velocity = Vec3::new(0.0, 0.0, 2.0);
        // omega x r with r = +x gives +y
        let v = b.surface_velocity(Vec3::new(0.5, 0.0, 0.0));
        assert!((v - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }
}
