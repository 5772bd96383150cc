//! Lagrangian surface markers.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::BodyId;
use crate::serde_utils::vec3;

/// A point sampling the surface of a rigid body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Globally unique, assigned in creation order
    pub id: u64,
    /// Owning body
    pub body: BodyId,
    /// World position
    #[serde(with = "vec3")]
    pub position: Vec3,
    /// Offset from the body centre in the body frame at creation
    #[serde(with = "vec3")]
    pub anchor: Vec3,
    /// Field velocity interpolated at the marker (U, V, W)
    #[serde(with = "vec3")]
    pub velocity: Vec3,
    /// Force the body exerts on the fluid at this marker (Fx, Fy, Fz)
    #[serde(with = "vec3")]
    pub force: Vec3,
}

impl Marker {
    pub fn new(id: u64, body: BodyId, position: Vec3, anchor: Vec3) -> Self {
        Self {
            id,
            body,
            position,
            anchor,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
        }
    }
}

/// Collection of markers.
///
/// After [`crate::partition::redistribute`] the list is grouped by tile and
/// `tile_offsets[t]..tile_offsets[t + 1]` is the slice owned by tile `t`. The
/// last bucket holds markers outside every tile.
#[derive(Clone, Debug, Default)]
pub struct Markers {
    pub list: Vec<Marker>,
    next_id: u64,
    pub(crate) tile_offsets: Vec<usize>,
}

impl Markers {
    pub fn new() -> Self {
        Self {
            list: Vec::new(),
            next_id: 0,
            tile_offsets: Vec::new(),
        }
    }

    /// Rebuild a collection from stored markers (e.g. a checkpoint).
    ///
    /// New ids continue after the largest stored id.
    pub fn from_list(list: Vec<Marker>) -> Self {
        let next_id = list.iter().map(|m| m.id + 1).max().unwrap_or(0);
        Self {
            list,
            next_id,
            tile_offsets: Vec::new(),
        }
    }

    /// Id the next spawned marker will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Append a marker with a fresh id and return that id.
    pub fn spawn(&mut self, body: BodyId, position: Vec3, anchor: Vec3) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.list.push(Marker::new(id, body, position, anchor));
        // Any previous tiling no longer covers the list
        self.tile_offsets.clear();
        id
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.list.iter()
    }

    /// Markers of one body, in storage order.
    pub fn of_body(&self, body: BodyId) -> impl Iterator<Item = &Marker> {
        self.list.iter().filter(move |m| m.body == body)
    }

    /// Number of tiles of the last redistribution (0 if never redistributed).
    pub fn tile_count(&self) -> usize {
        self.tile_offsets.len().saturating_sub(2)
    }

    /// Markers owned by tile `t` after the last redistribution.
    ///
    /// Empty if `list` was shortened since then.
    pub fn tile(&self, t: usize) -> &[Marker] {
        match (self.tile_offsets.get(t), self.tile_offsets.get(t + 1)) {
            (Some(&start), Some(&end)) if t < self.tile_count() => {
                self.list.get(start..end).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    /// Markers that fell outside every tile at the last redistribution.
    pub fn unowned(&self) -> &[Marker] {
        match self.tile_offsets.len() {
            0 | 1 => &[],
            n => self
                .list
                .get(self.tile_offsets[n - 2]..self.tile_offsets[n - 1])
                .unwrap_or(&[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_assigns_monotonic_ids() {
        let mut markers = Markers::new();
        let a = markers.spawn(BodyId(0), Vec3::ONE, Vec3::ZERO);
        let b = markers.spawn(BodyId(0), Vec3::ONE, Vec3::ZERO);
        let c = markers.spawn(BodyId(1), Vec3::ONE, Vec3::ZERO);
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(markers.of_body(BodyId(0)).count(), 2);
    }

    #[test]
    fn test_from_list_continues_ids() {
        let list = vec![
            Marker::new(4, BodyId(0), Vec3::ZERO, Vec3::ZERO),
            Marker::new(9, BodyId(0), Vec3::ZERO, Vec3::ZERO),
        ];
        let mut markers = Markers::from_list(list);
        assert_eq!(markers.spawn(BodyId(0), Vec3::ZERO, Vec3::ZERO), 10);
    }

    #[test]
    fn test_untiled_collection_has_no_tiles() {
        let mut markers = Markers::new();
        markers.spawn(BodyId(0), Vec3::ONE, Vec3::ZERO);
        assert_eq!(markers.tile_count(), 0);
        assert!(markers.tile(0).is_empty());
        assert!(markers.unowned().is_empty());
    }

    #[test]
    fn test_truncated_list_gives_empty_tiles() {
        let mut markers = Markers::new();
        for i in 0..4 {
            markers.spawn(BodyId(0), Vec3::splat(i as f32), Vec3::ZERO);
        }
        // Two tiles of two markers and an unowned bucket of one
        markers.list.push(Marker::new(4, BodyId(0), Vec3::ZERO, Vec3::ZERO));
        markers.tile_offsets = vec![0, 2, 4, 5];
        assert_eq!(markers.tile(1).len(), 2);
        assert_eq!(markers.unowned().len(), 1);

        markers.list.truncate(3);

        assert_eq!(markers.tile(0).len(), 2);
        assert!(markers.tile(1).is_empty());
        assert!(markers.unowned().is_empty());
    }
}
