//! Redistribution of markers into spatial tiles.
//!
//! The owned region of a field is cut into cubic tiles of `tile_cells` cells.
//! Redistribution is a stable counting sort of the marker list by tile:
//! 1. Compute the tile key of each marker
//! 2. Count markers per tile (histogram)
//! 3. Exclusive prefix sum to get tile offsets
//! 4. Scatter markers into sorted order
//!
//! Markers only move within the list; ids, owning body and every attribute are
//! carried over unchanged. Markers in the same tile touch overlapping stencils,
//! so grouping them keeps the transfer passes cache friendly.

use glam::Vec3;
use rayon::prelude::*;

use crate::field::Field3D;
use crate::marker::Markers;

/// Tiling of a field's owned region.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayout {
    origin: Vec3,
    cell_size: f32,
    dims: [usize; 3],
    tile_cells: usize,
    tiles: [usize; 3],
}

impl TileLayout {
    pub fn new(field: &Field3D, tile_cells: usize) -> Self {
        let tile_cells = tile_cells.max(1);
        let dims = field.dims();
        Self {
            origin: field.origin(),
            cell_size: field.cell_size(),
            dims,
            tile_cells,
            tiles: dims.map(|n| n.div_ceil(tile_cells).max(1)),
        }
    }

    /// Whether `field` has the owned region this layout was built for.
    pub fn covers(&self, field: &Field3D) -> bool {
        self.origin == field.origin()
            && self.cell_size == field.cell_size()
            && self.dims == field.dims()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn tile_cells(&self) -> usize {
        self.tile_cells
    }

    /// Tiles per axis.
    pub fn tiles(&self) -> [usize; 3] {
        self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles[0] * self.tiles[1] * self.tiles[2]
    }

    /// Tile owning `position`, or `None` outside the owned region.
    pub fn tile_of(&self, position: Vec3) -> Option<usize> {
        let l = ((position - self.origin) / self.cell_size).floor();
        let cell = [l.x, l.y, l.z];
        let mut t = [0usize; 3];
        for a in 0..3 {
            if !(cell[a] >= 0.0 && cell[a] < self.dims[a] as f32) {
                return None;
            }
            t[a] = cell[a] as usize / self.tile_cells;
        }
        Some(t[2] * self.tiles[0] * self.tiles[1] + t[1] * self.tiles[0] + t[0])
    }
}

/// Regroup `markers` by owning tile. Returns the number of unowned markers.
pub fn redistribute(markers: &mut Markers, layout: &TileLayout) -> usize {
    let tile_count = layout.tile_count();
    let unowned_key = tile_count;

    // 1. Keys
    let keys: Vec<usize> = markers
        .list
        .par_iter()
        .map(|m| layout.tile_of(m.position).unwrap_or(unowned_key))
        .collect();

    // 2. Histogram (tiles + unowned bucket)
    let mut counts = vec![0usize; tile_count + 1];
    for &k in &keys {
        counts[k] += 1;
    }

    // 3. Exclusive prefix sum
    let mut offsets = Vec::with_capacity(tile_count + 2);
    offsets.push(0);
    let mut running = 0;
    for &c in &counts {
        running += c;
        offsets.push(running);
    }

    // 4. Stable scatter
    let mut cursor = offsets[..tile_count + 1].to_vec();
    let mut sorted = markers.list.clone();
    for (marker, &k) in markers.list.iter().zip(&keys) {
        sorted[cursor[k]] = *marker;
        cursor[k] += 1;
    }

    markers.list = sorted;
    markers.tile_offsets = offsets;

    let unowned = counts[unowned_key];
    if unowned > 0 {
        log::warn!(
            "{} marker(s) outside the owned region after redistribution",
            unowned
        );
    }
    unowned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;

    fn field() -> Field3D {
        Field3D::new(Vec3::ZERO, 0.1, [16, 8, 8], 2, 3).unwrap()
    }

    #[test]
    fn test_tile_count_rounds_up() {
        let layout = TileLayout::new(&Field3D::new(Vec3::ZERO, 0.1, [10, 8, 3], 2, 3).unwrap(), 4);
        assert_eq!(layout.tiles(), [3, 2, 1]);
        assert_eq!(layout.tile_count(), 6);
    }

    #[test]
    fn test_tile_of() {
        let layout = TileLayout::new(&field(), 8);
        assert_eq!(layout.tile_of(Vec3::new(0.05, 0.05, 0.05)), Some(0));
        assert_eq!(layout.tile_of(Vec3::new(1.05, 0.05, 0.05)), Some(1));
        assert_eq!(layout.tile_of(Vec3::new(-0.01, 0.05, 0.05)), None);
        assert_eq!(layout.tile_of(Vec3::new(0.05, 0.85, 0.05)), None);
    }

    #[test]
    fn test_redistribute_groups_by_tile_stably() {
        let layout = TileLayout::new(&field(), 8);
        let mut markers = Markers::new();
        markers.spawn(BodyId(0), Vec3::new(1.2, 0.1, 0.1), Vec3::ZERO); // tile 1
        markers.spawn(BodyId(0), Vec3::new(0.2, 0.1, 0.1), Vec3::ZERO); // tile 0
        markers.spawn(BodyId(1), Vec3::new(-1.0, 0.1, 0.1), Vec3::ZERO); // unowned
        markers.spawn(BodyId(1), Vec3::new(1.5, 0.3, 0.3), Vec3::ZERO); // tile 1
        markers.list[3].force = Vec3::new(1.0, 2.0, 3.0);

        let unowned = redistribute(&mut markers, &layout);

        assert_eq!(unowned, 1);
        assert_eq!(markers.tile_count(), 2);
        let ids = |s: &[crate::marker::Marker]| s.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(markers.tile(0)), vec![1]);
        assert_eq!(ids(markers.tile(1)), vec![0, 3]);
        assert_eq!(ids(markers.unowned()), vec![2]);
        assert_eq!(markers.tile(1)[1].force, Vec3::new(1.0, 2.0, 3.0));
    }
}
