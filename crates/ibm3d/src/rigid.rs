//! Rigid-body force/motion integration with direct forcing.
//!
//! Sign convention: a marker's `force` is the force the body exerts on the
//! fluid at that marker, which is what gets spread. The body feels the
//! reaction, so its update subtracts the reduced loads.
//!
//! One coupling step per body:
//! 1. Reduce `ForceDv = sum(F dv)` and `Moment = sum(r x F dv)`, `r = x - X`
//! 2. Explicit update of velocity, angular velocity, location and orientation
//! 3. Per-marker direct forcing `F = rho / dt * (v_surface - U)`
//!
//! Reductions are a parallel fold/reduce over markers into per-body
//! accumulators; the kinematic update then runs body by body. No marker task
//! ever touches body state.

use glam::Vec3;
use rayon::prelude::*;
use std::f32::consts::PI;

use crate::body::{BodyId, BodyRecord, BodySet};
use crate::constants::{DENSITY_RATIO_TOLERANCE, EPSILON};
use crate::error::CouplingError;
use crate::marker::Markers;

/// Reduced surface loads of one body.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyLoads {
    /// `sum(F * dv)` over the body's markers
    pub force_dv: Vec3,
    /// `sum((x - X) x F * dv)` over the body's markers
    pub moment: Vec3,
}

impl BodyLoads {
    #[inline]
    fn combine(self, other: BodyLoads) -> BodyLoads {
        BodyLoads {
            force_dv: self.force_dv + other.force_dv,
            moment: self.moment + other.moment,
        }
    }
}

/// Slip feedback per step of the explicit update, `2 alpha rho N / |rho - 1|`.
///
/// `ForceDv` sums `N` markers but the update divides by one marker's `dv`,
/// so a body's slip error is multiplied by `1 - gain` every step. Above 2 the
/// error grows.
pub fn slip_feedback_gain(body: &BodyRecord, relaxation: f32) -> f32 {
    2.0 * relaxation * body.density * body.marker_count as f32
        / ((body.density - 1.0).abs() + EPSILON)
}

/// Reduce marker forces into per-body loads, indexed like `bodies`.
///
/// Markers whose body is not in `bodies` are skipped and counted; the count is
/// returned alongside the loads.
pub fn reduce_body_loads(bodies: &BodySet, markers: &Markers) -> (Vec<BodyLoads>, usize) {
    let n = bodies.len();
    markers
        .list
        .par_iter()
        .fold(
            || (vec![BodyLoads::default(); n], 0usize),
            |(mut loads, mut orphans), m| {
                match bodies.get(m.body) {
                    Some(body) => {
                        let f_dv = m.force * body.marker_volume;
                        let r = m.position - body.location;
                        loads[m.body.0] = loads[m.body.0].combine(BodyLoads {
                            force_dv: f_dv,
                            moment: r.cross(f_dv),
                        });
                    }
                    None => orphans += 1,
                }
                (loads, orphans)
            },
        )
        .reduce(
            || (vec![BodyLoads::default(); n], 0usize),
            |(mut a, oa), (b, ob)| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x = x.combine(y);
                }
                (a, oa + ob)
            },
        )
}

/// Explicitly advance one body from its reduced loads.
///
/// Bodies without markers are left untouched.
pub fn advance_body(
    id: BodyId,
    body: &mut BodyRecord,
    loads: &BodyLoads,
    gravity: Vec3,
    dt: f32,
    relaxation: f32,
) -> Result<(), CouplingError> {
    if body.marker_count == 0 {
        return Ok(());
    }
    let density_excess = body.density - 1.0;
    if density_excess.abs() < DENSITY_RATIO_TOLERANCE {
        return Err(CouplingError::DegenerateDensity {
            body: id,
            density: body.density,
        });
    }

    let dv = body.marker_volume + EPSILON;
    // rho / I(rho, R) with the density cancelled; radius is positive
    let density_over_inertia = 15.0 / (8.0 * PI * body.radius.powi(5));

    let old_velocity = body.velocity;
    let old_omega = body.angular_velocity;

    body.velocity = old_velocity
        - 2.0 * relaxation * dt / dv / density_excess * (loads.force_dv - gravity);
    body.angular_velocity = old_omega
        - 2.0 * relaxation * dt * density_over_inertia / density_excess * loads.moment;
    body.location += relaxation * dt * (body.velocity + old_velocity);
    body.orientation += relaxation * dt * (body.angular_velocity + old_omega);

    Ok(())
}

/// Set every marker's force to the direct-forcing value from its body's
/// current kinematics and the marker's interpolated velocity.
///
/// Markers of unknown bodies keep their force.
pub fn apply_direct_forcing(bodies: &BodySet, markers: &mut Markers, dt: f32) {
    markers.list.par_iter_mut().for_each(|m| {
        if let Some(body) = bodies.get(m.body) {
            let target = body.surface_velocity(m.position);
            m.force = body.density / dt * (target - m.velocity);
        }
    });
}

/// Re-place every marker rigidly at `location + rotation * anchor`.
pub fn reanchor_markers(bodies: &BodySet, markers: &mut Markers) {
    markers.list.par_iter_mut().for_each(|m| {
        if let Some(body) = bodies.get(m.body) {
            m.position = body.location + body.rotation() * m.anchor;
        }
    });
}

/// Fail on the first body with markers whose density ratio is 1.
pub fn check_densities(bodies: &BodySet) -> Result<(), CouplingError> {
    match bodies.iter().find(|(_, b)| {
        b.marker_count > 0 && (b.density - 1.0).abs() < DENSITY_RATIO_TOLERANCE
    }) {
        Some((id, body)) => Err(CouplingError::DegenerateDensity {
            body: id,
            density: body.density,
        }),
        None => Ok(()),
    }
}

/// Two-phase body update for all bodies: reduce, then advance each body.
///
/// Returns the loads that were applied.
pub fn update_bodies(
    bodies: &mut BodySet,
    markers: &Markers,
    gravity: Vec3,
    dt: f32,
    relaxation: f32,
) -> Result<Vec<BodyLoads>, CouplingError> {
    if dt <= 0.0 || !dt.is_finite() {
        return Err(CouplingError::InvalidTimeStep(dt));
    }
    // All bodies are checked before any of them moves
    check_densities(bodies)?;

    let (loads, orphans) = reduce_body_loads(bodies, markers);
    if orphans > 0 {
        log::warn!(
            "{} marker(s) reference no known body and were excluded from the reduction",
            orphans
        );
    }

    for ((id, body), body_loads) in bodies.iter_mut().zip(&loads) {
        if body.marker_count == 0 {
            log::debug!("Body {} has no markers, skipping update", id.0);
            continue;
        }
        advance_body(id, body, body_loads, gravity, dt, relaxation)?;
        log::debug!(
            "Body {}: location {:?}, velocity {:?}, omega {:?}",
            id.0,
            body.location,
            body.velocity,
            body.angular_velocity
        );
    }

    Ok(loads)
}
