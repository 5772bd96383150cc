//! Numerical constants for the immersed-boundary coupling.
//!
//! ## Units
//!
//! Densities are **relative** to the background fluid (fluid = 1.0), so a body
//! with `density == 1.0` is neutrally buoyant and the explicit update is
//! undefined for it. Lengths are in the same units as the field's cell size.

/// Gravity acceleration along -Y used when a configuration does not override it.
pub const GRAVITY: f32 = -9.8;

// =============================================================================
// KERNEL
// =============================================================================

/// Support radius of the regularized delta kernel, in cells.
pub const KERNEL_RADIUS: i32 = 2;

/// Number of samples per axis touched by one marker (`2 * KERNEL_RADIUS + 1`).
pub const STENCIL_WIDTH: usize = (2 * KERNEL_RADIUS + 1) as usize;

/// Minimum ghost layer a field needs so every stencil of an owned marker fits.
pub const MIN_GHOST_CELLS: usize = KERNEL_RADIUS as usize;

// =============================================================================
// MARKER GENERATION
// =============================================================================

/// Empirical azimuthal step of the spiral sphere sampling.
pub const SPIRAL_CONSTANT: f64 = 3.809;

// =============================================================================
// RIGID-BODY UPDATE
// =============================================================================

/// Default relaxation coefficient of the explicit feedback update.
///
/// At 0.5 the position update is a plain trapezoidal rule.
pub const DEFAULT_RELAXATION: f32 = 0.5;

/// Additive guard for weighted denominators.
pub const EPSILON: f32 = 1e-12;

/// `|density - 1|` below this is treated as a neutrally buoyant body.
pub const DENSITY_RATIO_TOLERANCE: f32 = 1e-6;

// =============================================================================
// PARTITIONING
// =============================================================================

/// Edge length, in cells, of one redistribution tile.
pub const DEFAULT_TILE_CELLS: usize = 8;
