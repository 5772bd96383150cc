//! Structured, cell-centred field patch with a ghost layer.
//!
//! A `Field3D` stores `components` scalar channels on the cells of one owned
//! box plus `ghost` layers of cells on every side. Cell `(i, j, k)` has its
//! sample at `origin + (i + 0.5, j + 0.5, k + 0.5) * cell_size`; owned cells
//! are `0..dims`, ghost cells extend the range to `-ghost..dims + ghost`.
//!
//! The velocity the coupling reads and the body force it writes are both
//! `Field3D`s, either separate fields or channel ranges of one field.

use glam::Vec3;

use crate::constants::MIN_GHOST_CELLS;
use crate::error::CouplingError;
use crate::kernels::Stencil;

#[derive(Clone, Debug)]
pub struct Field3D {
    /// Low corner of the owned region
    origin: Vec3,
    /// Edge length of one (cubic) cell
    cell_size: f32,
    /// Owned cells per axis
    dims: [usize; 3],
    /// Ghost layers on each side
    ghost: usize,
    /// Channel-major storage, each channel covers the padded box
    channels: Vec<Vec<f32>>,
}

impl Field3D {
    /// Create a zeroed field.
    pub fn new(
        origin: Vec3,
        cell_size: f32,
        dims: [usize; 3],
        ghost: usize,
        components: usize,
    ) -> Result<Self, CouplingError> {
        if cell_size <= 0.0 || !cell_size.is_finite() {
            return Err(CouplingError::InvalidCellSize(cell_size));
        }
        if ghost < MIN_GHOST_CELLS {
            return Err(CouplingError::InsufficientGhost {
                ghost,
                required: MIN_GHOST_CELLS,
            });
        }

        let padded = dims.map(|n| n + 2 * ghost);
        let len = padded[0] * padded[1] * padded[2];

        Ok(Self {
            origin,
            cell_size,
            dims,
            ghost,
            channels: vec![vec![0.0; len]; components],
        })
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_volume(&self) -> f32 {
        self.cell_size * self.cell_size * self.cell_size
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn ghost(&self) -> usize {
        self.ghost
    }

    pub fn components(&self) -> usize {
        self.channels.len()
    }

    /// Padded extent per axis (owned + both ghost layers).
    pub fn padded_dims(&self) -> [usize; 3] {
        self.dims.map(|n| n + 2 * self.ghost)
    }

    /// Number of stored cells per channel.
    pub fn len(&self) -> usize {
        let p = self.padded_dims();
        p[0] * p[1] * p[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// High corner of the owned region.
    pub fn upper(&self) -> Vec3 {
        self.origin
            + Vec3::new(self.dims[0] as f32, self.dims[1] as f32, self.dims[2] as f32)
                * self.cell_size
    }

    /// Whether two fields cover the same cells.
    pub fn same_layout(&self, other: &Field3D) -> bool {
        self.origin == other.origin
            && self.cell_size == other.cell_size
            && self.dims == other.dims
            && self.ghost == other.ghost
    }

    // ========== Indexing ==========

    /// Flat index of cell `(i, j, k)`, or `None` outside owned + ghost cells.
    #[inline]
    pub fn index(&self, cell: [i32; 3]) -> Option<usize> {
        let g = self.ghost as i32;
        let p = self.padded_dims();
        let mut shifted = [0usize; 3];
        for a in 0..3 {
            let s = cell[a] + g;
            if s < 0 || s >= p[a] as i32 {
                return None;
            }
            shifted[a] = s as usize;
        }
        Some(shifted[2] * p[0] * p[1] + shifted[1] * p[0] + shifted[0])
    }

    /// Inverse of [`Field3D::index`].
    #[inline]
    pub fn cell_of_index(&self, idx: usize) -> [i32; 3] {
        let p = self.padded_dims();
        let g = self.ghost as i32;
        [
            (idx % p[0]) as i32 - g,
            ((idx / p[0]) % p[1]) as i32 - g,
            (idx / (p[0] * p[1])) as i32 - g,
        ]
    }

    /// World position of the sample of cell `(i, j, k)`.
    pub fn cell_center(&self, cell: [i32; 3]) -> Vec3 {
        self.origin
            + (Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32) + 0.5) * self.cell_size
    }

    /// Cell containing `position` (may be a ghost or outside cell).
    pub fn cell_containing(&self, position: Vec3) -> [i32; 3] {
        let l = ((position - self.origin) / self.cell_size).floor();
        [l.x as i32, l.y as i32, l.z as i32]
    }

    /// Whether `position` lies in the owned region.
    pub fn owns(&self, position: Vec3) -> bool {
        let c = self.cell_containing(position);
        (0..3).all(|a| c[a] >= 0 && c[a] < self.dims[a] as i32)
    }

    /// Kernel stencil of a marker at `position` on this field.
    pub fn stencil(&self, position: Vec3) -> Stencil {
        Stencil::new(position, self.origin, self.cell_size)
    }

    /// Whether every cell of `stencil` is stored (owned or ghost).
    pub fn contains_stencil(&self, stencil: &Stencil) -> bool {
        let (lo, hi) = stencil.bounds();
        self.index(lo).is_some() && self.index(hi).is_some()
    }

    /// First cell of `stencil` that is not stored, if any.
    pub fn first_missing_cell(&self, stencil: &Stencil) -> Option<[i32; 3]> {
        let (lo, hi) = stencil.bounds();
        [lo, hi].into_iter().find(|c| self.index(*c).is_none())
    }

    // ========== Channel accessors ==========

    pub fn channel(&self, c: usize) -> &[f32] {
        &self.channels[c]
    }

    pub fn channel_mut(&mut self, c: usize) -> &mut [f32] {
        &mut self.channels[c]
    }

    /// Value of channel `c` at `cell`; zero outside the stored box.
    pub fn get(&self, c: usize, cell: [i32; 3]) -> f32 {
        self.index(cell).map_or(0.0, |idx| self.channels[c][idx])
    }

    /// Set channel `c` at `cell`. Returns false when the cell is not stored.
    pub fn set(&mut self, c: usize, cell: [i32; 3], value: f32) -> bool {
        match self.index(cell) {
            Some(idx) => {
                self.channels[c][idx] = value;
                true
            }
            None => false,
        }
    }

    /// Fill channel `c` (including ghosts) with `value`.
    pub fn fill(&mut self, c: usize, value: f32) {
        self.channels[c].fill(value);
    }

    /// Fill three consecutive channels starting at `first` with a vector.
    pub fn fill_vector(&mut self, first: usize, value: Vec3) {
        for a in 0..3 {
            self.fill(first + a, value[a]);
        }
    }

    /// Set every cell of three consecutive channels from a function of the
    /// cell-centre position.
    pub fn fill_vector_with(&mut self, first: usize, f: impl Fn(Vec3) -> Vec3) {
        for idx in 0..self.len() {
            let v = f(self.cell_center(self.cell_of_index(idx)));
            for a in 0..3 {
                self.channels[first + a][idx] = v[a];
            }
        }
    }

    /// Zero three consecutive channels starting at `first`.
    pub fn reset_vector(&mut self, first: usize) {
        for a in 0..3 {
            self.fill(first + a, 0.0);
        }
    }

    /// Sum of channel `c` over every stored cell.
    pub fn sum(&self, c: usize) -> f32 {
        self.channels[c].iter().sum()
    }

    /// Volume integral of three consecutive channels over every stored cell.
    pub fn integrate_vector(&self, first: usize) -> Vec3 {
        Vec3::new(self.sum(first), self.sum(first + 1), self.sum(first + 2)) * self.cell_volume()
    }

    /// Check that channels `first..first + 3` exist.
    pub fn check_vector_channels(&self, first: usize) -> Result<(), CouplingError> {
        if first + 3 > self.components() {
            return Err(CouplingError::ChannelOutOfRange {
                first,
                components: self.components(),
            });
        }
        Ok(())
    }
}
