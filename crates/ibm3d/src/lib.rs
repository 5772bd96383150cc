//! 3D Immersed-Boundary Coupling
//!
//! Couples rigid spherical bodies, sampled by Lagrangian surface markers, to a
//! structured background field. Each step gathers field velocity to the
//! markers with a regularized delta kernel, updates the body kinematics from
//! the direct-forcing loads and spreads the marker forces back to a body-force
//! field that the field solver consumes.
//!
//! # Example
//!
//! ```
//! use ibm3d::{CouplingConfig, Field3D, ImmersedBoundary3D, SphereConfig};
//! use glam::Vec3;
//!
//! let mut velocity = Field3D::new(Vec3::ZERO, 0.05, [20, 20, 20], 2, 3).unwrap();
//! let mut force = Field3D::new(Vec3::ZERO, 0.05, [20, 20, 20], 2, 3).unwrap();
//! velocity.fill_vector(0, Vec3::new(1.0, 0.0, 0.0));
//!
//! let mut ib = ImmersedBoundary3D::new(&velocity, CouplingConfig::without_gravity());
//! ib.spawn_sphere(&SphereConfig::new(Vec3::splat(0.5), 0.1, 5.0)).unwrap();
//!
//! // One coupling step; `force` now holds the body force on the fluid
//! ib.step(&velocity, &mut force, 1e-3).unwrap();
//! assert!(ib.bodies.as_slice()[0].velocity.x > 0.0);
//! ```

pub mod atomic;
pub mod body;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod kernels;
pub mod marker;
pub mod partition;
pub mod rigid;
pub mod sampling;
pub mod serde_utils;
pub mod transfer;

pub use body::{BodyId, BodyRecord, BodySet};
pub use checkpoint::CouplingCheckpoint;
pub use config::{
    CouplingConfig, FieldConfig, MarkerAnchoring, ScenarioConfig, SphereConfig, SpreadStrategy,
};
pub use diagnostics::{BodyTrajectory, TrajectoryRow};
pub use error::CouplingError;
pub use field::Field3D;
pub use glam::Vec3;
pub use marker::{Marker, Markers};
pub use partition::TileLayout;
pub use rigid::BodyLoads;

use transfer::TransferBuffers;

/// Marker/grid coupling for a set of rigid bodies on one field patch.
pub struct ImmersedBoundary3D {
    /// Rigid bodies in creation order
    pub bodies: BodySet,
    /// Surface markers of every body
    pub markers: Markers,
    pub config: CouplingConfig,

    /// Tiling of the owned region used for redistribution
    tiles: TileLayout,
    /// Spread accumulators (pre-allocated to avoid per-step allocation)
    transfer_buffers: TransferBuffers,

    /// Completed coupling steps
    pub step_count: u64,
}

impl ImmersedBoundary3D {
    /// Create an empty coupling for fields laid out like `layout`.
    pub fn new(layout: &Field3D, config: CouplingConfig) -> Self {
        let tiles = TileLayout::new(layout, config.tile_cells);
        let transfer_buffers = TransferBuffers::new(layout);

        log::info!(
            "Immersed boundary on {:?} cells (h = {}), {} tiles, {:?} spread",
            layout.dims(),
            layout.cell_size(),
            tiles.tile_count(),
            config.spread
        );

        Self {
            bodies: BodySet::new(),
            markers: Markers::new(),
            config,
            tiles,
            transfer_buffers,
            step_count: 0,
        }
    }

    /// Build the coupling and every body of a scenario.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, CouplingError> {
        scenario.validate()?;
        let layout = scenario.field.build(0)?;
        let mut ib = Self::new(&layout, scenario.coupling.clone());
        for sphere in &scenario.bodies {
            ib.spawn_sphere(sphere)?;
        }
        Ok(ib)
    }

    /// Generate the markers of a sphere and register its body.
    pub fn spawn_sphere(&mut self, sphere: &SphereConfig) -> Result<BodyId, CouplingError> {
        let id = sampling::spawn_sphere(
            &mut self.bodies,
            &mut self.markers,
            sphere,
            self.tiles.cell_size(),
        )?;
        partition::redistribute(&mut self.markers, &self.tiles);

        if let Some(body) = self.bodies.get(id) {
            let gain = rigid::slip_feedback_gain(body, self.config.relaxation);
            if gain > 2.0 {
                log::warn!(
                    "Body {}: slip feedback gain {:.2} exceeds 2, the body update will diverge; \
                     keep relaxation below {:.3e}",
                    id.0,
                    gain,
                    2.0 * self.config.relaxation / gain
                );
            }
        }
        Ok(id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Check that `field` matches the layout this coupling was built for.
    fn check_layout(&self, field: &Field3D) -> Result<(), CouplingError> {
        if !self.tiles.covers(field) || field.len() != self.transfer_buffers.len() {
            return Err(CouplingError::FieldMismatch(format!(
                "field with {:?} cells (h = {}, ghost {}) does not match the coupling layout",
                field.dims(),
                field.cell_size(),
                field.ghost()
            )));
        }
        Ok(())
    }

    /// Gather field velocity to every marker.
    pub fn interpolate(&mut self, velocity: &Field3D) -> Result<(), CouplingError> {
        self.check_layout(velocity)?;
        transfer::interpolate_velocities(
            velocity,
            self.config.velocity_channel,
            &mut self.markers,
            &self.bodies,
        )
    }

    /// Direct-forcing body update from the current marker velocities.
    ///
    /// Marker forces are first set from the current kinematics, reduced into
    /// body loads, the bodies advanced, and the forces recomputed from the new
    /// kinematics. Returns the loads each body received.
    pub fn update_bodies(&mut self, dt: f32) -> Result<Vec<BodyLoads>, CouplingError> {
        if dt <= 0.0 || !dt.is_finite() {
            return Err(CouplingError::InvalidTimeStep(dt));
        }
        rigid::check_densities(&self.bodies)?;

        // Predictor
        rigid::apply_direct_forcing(&self.bodies, &mut self.markers, dt);

        let loads = rigid::update_bodies(
            &mut self.bodies,
            &self.markers,
            self.config.gravity,
            dt,
            self.config.relaxation,
        )?;

        // Corrector
        rigid::apply_direct_forcing(&self.bodies, &mut self.markers, dt);

        Ok(loads)
    }

    /// Reset the force channels of `force` and spread every marker force.
    pub fn spread(&mut self, force: &mut Field3D) -> Result<(), CouplingError> {
        self.check_layout(force)?;
        transfer::spread_forces(
            force,
            self.config.force_channel,
            &self.markers,
            &self.bodies,
            self.config.spread,
            &self.transfer_buffers,
        )
    }

    /// Move markers with their bodies (per the anchoring mode) and regroup
    /// them into tiles.
    pub fn reposition(&mut self) {
        if self.config.anchoring == MarkerAnchoring::Rigid {
            rigid::reanchor_markers(&self.bodies, &mut self.markers);
        }
        partition::redistribute(&mut self.markers, &self.tiles);
    }

    /// Run one coupling step with separate velocity and force fields.
    ///
    /// Every precondition is checked before any state changes.
    pub fn step(
        &mut self,
        velocity: &Field3D,
        force: &mut Field3D,
        dt: f32,
    ) -> Result<Vec<BodyLoads>, CouplingError> {
        self.check_step(velocity, force, dt)?;

        self.interpolate(velocity)?;
        let loads = self.update_bodies(dt)?;
        self.spread(force)?;
        self.finish_step();

        Ok(loads)
    }

    /// Run one coupling step on a field holding both the velocity channels
    /// and the force channels.
    pub fn step_in_place(
        &mut self,
        field: &mut Field3D,
        dt: f32,
    ) -> Result<Vec<BodyLoads>, CouplingError> {
        let (v, f) = (self.config.velocity_channel, self.config.force_channel);
        if v.max(f) - v.min(f) < 3 {
            return Err(CouplingError::FieldMismatch(format!(
                "velocity channels {}..{} overlap force channels {}..{}",
                v,
                v + 3,
                f,
                f + 3
            )));
        }
        let view: &Field3D = field;
        self.check_step(view, view, dt)?;

        self.interpolate(field)?;
        let loads = self.update_bodies(dt)?;
        self.spread(field)?;
        self.finish_step();

        Ok(loads)
    }

    fn check_step(&self, velocity: &Field3D, force: &Field3D, dt: f32) -> Result<(), CouplingError> {
        if dt <= 0.0 || !dt.is_finite() {
            return Err(CouplingError::InvalidTimeStep(dt));
        }
        self.check_layout(velocity)?;
        self.check_layout(force)?;
        velocity.check_vector_channels(self.config.velocity_channel)?;
        force.check_vector_channels(self.config.force_channel)?;
        rigid::check_densities(&self.bodies)?;
        // Positions do not change until the step ends, so one check covers
        // both transfers
        transfer::check_stencils(velocity, &self.markers, &self.bodies)
    }

    fn finish_step(&mut self) {
        self.reposition();
        self.step_count += 1;
        log::debug!(
            "Coupling step {} done ({} bodies, {} markers)",
            self.step_count,
            self.bodies.len(),
            self.markers.len()
        );
    }

    // ========== Checkpointing ==========

    /// Snapshot of bodies, markers and the step counter.
    pub fn checkpoint(&self) -> CouplingCheckpoint {
        CouplingCheckpoint {
            step: self.step_count,
            bodies: self.bodies.clone(),
            markers: self.markers.list.clone(),
        }
    }

    /// Replace the coupling state with a checkpoint.
    pub fn restore(&mut self, checkpoint: CouplingCheckpoint) {
        self.bodies = checkpoint.bodies;
        self.markers = Markers::from_list(checkpoint.markers);
        self.step_count = checkpoint.step;
        partition::redistribute(&mut self.markers, &self.tiles);
        log::info!(
            "Restored step {}: {} bodies, {} markers",
            self.step_count,
            self.bodies.len(),
            self.markers.len()
        );
    }
}
