//! Regularized delta kernel for marker/grid transfers.
//!
//! Peskin's four-point kernel: compact support of two cells on each side,
//! even, and a partition of unity for every sub-cell position. The same weights
//! are used for interpolation and spreading so the two transfers stay adjoint.

use glam::Vec3;

use crate::constants::{KERNEL_RADIUS, STENCIL_WIDTH};

/// Dimensionless 1D kernel `phi(r)`, `r` in cells.
#[inline]
pub fn peskin4_1d(r: f32) -> f32 {
    let r = r.abs();
    if r < 1.0 {
        0.125 * (3.0 - 2.0 * r + (1.0 + 4.0 * r - 4.0 * r * r).sqrt())
    } else if r < 2.0 {
        0.125 * (5.0 - 2.0 * r - (-7.0 + 12.0 * r - 4.0 * r * r).sqrt())
    } else {
        0.0
    }
}

/// 1D regularized delta `phi(r) / h`.
#[inline]
pub fn delta_1d(offset: f32, cell_size: f32) -> f32 {
    peskin4_1d(offset) / cell_size
}

/// 3D regularized delta (tensor product of 1D). `offset` is in cells.
#[inline]
pub fn delta_3d(offset: Vec3, cell_size: f32) -> f32 {
    delta_1d(offset.x, cell_size) * delta_1d(offset.y, cell_size) * delta_1d(offset.z, cell_size)
}

/// Per-axis weights of the `5x5x5` samples around one marker.
///
/// Samples sit at cell centres `origin + (i + 0.5) * h`. `base` is the cell
/// containing the marker and `weights[axis][o]` is the delta weight of sample
/// `base[axis] + o - 2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stencil {
    pub base: [i32; 3],
    pub weights: [[f32; STENCIL_WIDTH]; 3],
}

impl Stencil {
    pub fn new(position: Vec3, origin: Vec3, cell_size: f32) -> Self {
        let local = (position - origin) / cell_size;
        let base_f = local.floor();
        let frac = local - base_f;
        let base = [base_f.x as i32, base_f.y as i32, base_f.z as i32];

        let mut weights = [[0.0; STENCIL_WIDTH]; 3];
        for (axis, row) in weights.iter_mut().enumerate() {
            for (o, w) in row.iter_mut().enumerate() {
                let ii = o as i32 - KERNEL_RADIUS;
                *w = delta_1d(frac[axis] - ii as f32 - 0.5, cell_size);
            }
        }

        Self { base, weights }
    }

    /// Lowest and highest cell index (inclusive) the stencil touches.
    #[inline]
    pub fn bounds(&self) -> ([i32; 3], [i32; 3]) {
        let lo = self.base.map(|b| b - KERNEL_RADIUS);
        let hi = self.base.map(|b| b + KERNEL_RADIUS);
        (lo, hi)
    }

    /// All 125 `(cell, weight)` pairs, z-major.
    pub fn cells(&self) -> impl Iterator<Item = ([i32; 3], f32)> + '_ {
        let n = STENCIL_WIDTH;
        (0..n * n * n).map(move |flat| {
            let (oi, oj, ok) = (flat % n, (flat / n) % n, flat / (n * n));
            let cell = [
                self.base[0] + oi as i32 - KERNEL_RADIUS,
                self.base[1] + oj as i32 - KERNEL_RADIUS,
                self.base[2] + ok as i32 - KERNEL_RADIUS,
            ];
            let w = self.weights[0][oi] * self.weights[1][oj] * self.weights[2][ok];
            (cell, w)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peskin_at_zero() {
        assert!((peskin4_1d(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_peskin_at_one() {
        assert!((peskin4_1d(1.0) - 0.25).abs() < 1e-6);
        assert!((peskin4_1d(-1.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_peskin_zero_outside_support() {
        assert_eq!(peskin4_1d(2.0), 0.0);
        assert_eq!(peskin4_1d(-2.5), 0.0);
        assert!(peskin4_1d(1.999).abs() < 1e-3);
    }

    #[test]
    fn test_peskin_partition_of_unity() {
        for x in [0.0f32, 0.1, 0.25, 0.5, 0.75, 0.9] {
            let sum: f32 = (-3..=3).map(|i| peskin4_1d(x - i as f32)).sum();
            assert!((sum - 1.0).abs() < 1e-5, "Partition failed at x={}: sum={}", x, sum);
        }
    }

    #[test]
    fn test_peskin_first_moment_vanishes() {
        for x in [0.0f32, 0.3, 0.5, 0.8] {
            let moment: f32 = (-3..=3)
                .map(|i| (x - i as f32) * peskin4_1d(x - i as f32))
                .sum();
            assert!(moment.abs() < 1e-5, "First moment at x={}: {}", x, moment);
        }
    }

    #[test]
    fn test_delta_scales_with_cell_size() {
        let h = 0.05;
        assert!((delta_1d(0.0, h) - 0.5 / h).abs() < 1e-3);
        let d = delta_3d(Vec3::ZERO, h);
        assert!((d * h * h * h - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_stencil_weights_sum_to_one() {
        let h = 0.1;
        let stencil = Stencil::new(Vec3::new(0.437, 0.21, 0.05), Vec3::ZERO, h);
        let sum: f32 = stencil.cells().map(|(_, w)| w * h * h * h).sum();
        assert!((sum - 1.0).abs() < 1e-4, "Stencil sum = {}", sum);
        assert_eq!(stencil.cells().count(), 125);
    }

    #[test]
    fn test_stencil_base_cell() {
        let stencil = Stencil::new(Vec3::new(0.25, 1.05, -0.05), Vec3::ZERO, 0.1);
        assert_eq!(stencil.base, [2, 10, -1]);
        let (lo, hi) = stencil.bounds();
        assert_eq!(lo, [0, 8, -3]);
        assert_eq!(hi, [4, 12, 1]);
    }
}
