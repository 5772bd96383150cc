//! Coupling and scenario configuration.
//!
//! Plain serde structs, loadable from JSON or YAML. A scenario file looks
//! like:
//!
//! ```yaml
//! name: sphere in stream
//! dt: 0.001
//! steps: 20
//! background_velocity: [1.0, 0.0, 0.0]
//! field:
//!   origin: [0.0, 0.0, 0.0]
//!   cell_size: 0.05
//!   dims: [20, 20, 20]
//!   ghost: 2
//! coupling:
//!   relaxation: 0.01
//!   gravity: [0.0, 0.0, 0.0]
//!   spread: atomic
//!   anchoring: rigid
//! bodies:
//!   - center: [0.5, 0.5, 0.5]
//!     radius: 0.1
//!     density: 5.0
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_RELAXATION, DEFAULT_TILE_CELLS, DENSITY_RATIO_TOLERANCE, GRAVITY, MIN_GHOST_CELLS,
};
use crate::error::CouplingError;
use crate::field::Field3D;
use crate::serde_utils::vec3;

/// How spread contributions from many markers are merged into shared cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadStrategy {
    /// Atomic adds into one shared accumulator
    #[default]
    Atomic,
    /// Per-worker private buffers merged after the pass
    Privatized,
}

/// What happens to marker positions after the body moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerAnchoring {
    /// Markers are re-placed at `location + rotation * anchor` every step
    #[default]
    Rigid,
    /// Markers stay where they were generated
    Drift,
}

/// Geometry of the structured field patch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(with = "vec3")]
    pub origin: Vec3,
    pub cell_size: f32,
    pub dims: [usize; 3],
    #[serde(default = "default_ghost")]
    pub ghost: usize,
}

fn default_ghost() -> usize {
    MIN_GHOST_CELLS
}

impl FieldConfig {
    /// Allocate a zeroed field with `components` channels.
    pub fn build(&self, components: usize) -> Result<Field3D, CouplingError> {
        Field3D::new(self.origin, self.cell_size, self.dims, self.ghost, components)
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            cell_size: 0.05,
            dims: [20, 20, 20],
            ghost: MIN_GHOST_CELLS,
        }
    }
}

/// Initial state of one spherical body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereConfig {
    #[serde(with = "vec3")]
    pub center: Vec3,
    pub radius: f32,
    /// Density relative to the fluid; must not be 1
    pub density: f32,
    #[serde(with = "vec3", default = "zero_vec3")]
    pub velocity: Vec3,
    #[serde(with = "vec3", default = "zero_vec3")]
    pub angular_velocity: Vec3,
}

fn zero_vec3() -> Vec3 {
    Vec3::ZERO
}

impl SphereConfig {
    pub fn new(center: Vec3, radius: f32, density: f32) -> Self {
        Self {
            center,
            radius,
            density,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Parameters of the coupling itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// Relaxation coefficient `alpha` of the explicit body update.
    ///
    /// The update is stable while `2 alpha rho N / |rho - 1| < 2` for a body
    /// of density ratio `rho` with `N` markers, i.e. `alpha < |rho - 1| / (rho N)`.
    /// The default suits few markers only; resolved spheres need far less.
    pub relaxation: f32,
    #[serde(with = "vec3")]
    pub gravity: Vec3,
    pub spread: SpreadStrategy,
    pub anchoring: MarkerAnchoring,
    /// First of the three velocity channels read by interpolation
    pub velocity_channel: usize,
    /// First of the three force channels written by spreading
    pub force_channel: usize,
    /// Tile edge (cells) for marker redistribution
    pub tile_cells: usize,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            relaxation: DEFAULT_RELAXATION,
            gravity: Vec3::new(0.0, GRAVITY, 0.0),
            spread: SpreadStrategy::Atomic,
            anchoring: MarkerAnchoring::Rigid,
            velocity_channel: 0,
            force_channel: 0,
            tile_cells: DEFAULT_TILE_CELLS,
        }
    }
}

impl CouplingConfig {
    /// Defaults with gravity switched off.
    pub fn without_gravity() -> Self {
        Self {
            gravity: Vec3::ZERO,
            ..Self::default()
        }
    }
}

/// Complete description of a run, used by the demo binaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub dt: f32,
    pub steps: usize,
    /// Uniform velocity the background field starts with
    #[serde(with = "vec3", default = "zero_vec3")]
    pub background_velocity: Vec3,
    pub field: FieldConfig,
    #[serde(default)]
    pub coupling: CouplingConfig,
    pub bodies: Vec<SphereConfig>,
    /// Write a marker dump every this many steps (0 = never)
    #[serde(default)]
    pub dump_every: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "sphere in stream".to_string(),
            dt: 1e-3,
            steps: 20,
            background_velocity: Vec3::new(1.0, 0.0, 0.0),
            field: FieldConfig::default(),
            // The explicit update feeds back `2 alpha rho N / (rho - 1)` times
            // the slip, so multi-step runs need alpha well below 1 / N
            coupling: CouplingConfig {
                relaxation: 0.01,
                ..CouplingConfig::without_gravity()
            },
            bodies: vec![SphereConfig::new(Vec3::splat(0.5), 0.1, 5.0)],
            dump_every: 5,
        }
    }
}

impl ScenarioConfig {
    /// Check every precondition that can be checked before a run.
    pub fn validate(&self) -> Result<(), CouplingError> {
        if self.dt <= 0.0 || !self.dt.is_finite() {
            return Err(CouplingError::InvalidTimeStep(self.dt));
        }
        if self.field.cell_size <= 0.0 || !self.field.cell_size.is_finite() {
            return Err(CouplingError::InvalidCellSize(self.field.cell_size));
        }
        if self.field.ghost < MIN_GHOST_CELLS {
            return Err(CouplingError::InsufficientGhost {
                ghost: self.field.ghost,
                required: MIN_GHOST_CELLS,
            });
        }
        for (i, body) in self.bodies.iter().enumerate() {
            if body.radius <= 0.0 || !body.radius.is_finite() {
                return Err(CouplingError::InvalidRadius(body.radius));
            }
            if (body.density - 1.0).abs() < DENSITY_RATIO_TOLERANCE {
                return Err(CouplingError::DegenerateDensity {
                    body: crate::body::BodyId(i),
                    density: body.density,
                });
            }
        }
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_json(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn save_yaml(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load configuration from YAML file
    pub fn load_yaml(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&yaml)?;
        Ok(config)
    }
}
