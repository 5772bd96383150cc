//! Error type for coupling preconditions.
//!
//! Every variant is fatal for the step that produced it. Configuration
//! inconsistencies that the coupling tolerates (orphan markers, empty bodies)
//! are logged instead and never show up here.

use crate::body::BodyId;

#[derive(Debug, Clone, PartialEq)]
pub enum CouplingError {
    /// A marker's kernel stencil reaches outside the owned + ghost region.
    StencilOutsideField {
        marker_id: u64,
        body: BodyId,
        cell: [i32; 3],
    },
    /// `density == 1` makes the explicit update divide by zero.
    DegenerateDensity { body: BodyId, density: f32 },
    InvalidCellSize(f32),
    InvalidTimeStep(f32),
    InvalidRadius(f32),
    InsufficientGhost { ghost: usize, required: usize },
    /// The grid is too coarse to place at least two markers on the sphere.
    TooFewMarkers { radius: f32, cell_size: f32, count: usize },
    /// Two fields (or a field and the coupling buffers) do not share a shape.
    FieldMismatch(String),
    /// A channel range does not fit in the field's component count.
    ChannelOutOfRange { first: usize, components: usize },
}

impl std::fmt::Display for CouplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouplingError::StencilOutsideField {
                marker_id,
                body,
                cell,
            } => write!(
                f,
                "Marker {} of body {} needs cell {:?} outside the owned + ghost region",
                marker_id, body.0, cell
            ),
            CouplingError::DegenerateDensity { body, density } => write!(
                f,
                "Body {} has density {} (density ratio 1 is undefined)",
                body.0, density
            ),
            CouplingError::InvalidCellSize(h) => write!(f, "Cell size must be positive, got {}", h),
            CouplingError::InvalidTimeStep(dt) => {
                write!(f, "Time step must be positive, got {}", dt)
            }
            CouplingError::InvalidRadius(r) => write!(f, "Body radius must be positive, got {}", r),
            CouplingError::InsufficientGhost { ghost, required } => write!(
                f,
                "Field has {} ghost cells, kernel support needs {}",
                ghost, required
            ),
            CouplingError::TooFewMarkers {
                radius,
                cell_size,
                count,
            } => write!(
                f,
                "Radius {} on cell size {} yields only {} markers",
                radius, cell_size, count
            ),
            CouplingError::FieldMismatch(msg) => write!(f, "Field mismatch: {}", msg),
            CouplingError::ChannelOutOfRange { first, components } => write!(
                f,
                "Channels {}..{} do not fit in a {}-component field",
                first,
                first + 3,
                components
            ),
        }
    }
}

impl std::error::Error for CouplingError {}
