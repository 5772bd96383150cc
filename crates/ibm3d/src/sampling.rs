//! Marker generation on sphere surfaces.
//!
//! Markers follow a generalized spiral: heights `H_k` are evenly spaced in
//! `[-1, 1]` and the azimuth advances by `c / sqrt(N) / sqrt(1 - H_k^2)`, which
//! spreads points evenly without clustering at the poles. The sequence is
//! deterministic for a given count.

use glam::Vec3;
use std::f64::consts::PI;

use crate::body::{BodyId, BodyRecord, BodySet};
use crate::config::SphereConfig;
use crate::constants::SPIRAL_CONSTANT;
use crate::error::CouplingError;
use crate::marker::Markers;

/// Number of markers that gives one marker per mesh-sized patch of a sphere
/// of `radius` on a grid of spacing `cell_size`.
pub fn sphere_marker_count(radius: f32, cell_size: f32) -> usize {
    let ratio = radius as f64 / cell_size as f64;
    (PI / 3.0 * (12.0 * ratio * ratio)) as usize
}

/// Surface volume element of each of `count` markers.
///
/// `count * dv` equals the volume of a shell of thickness `h` centred on the
/// sphere surface, `pi * h / 3 * (12 R^2 + h^2)`.
pub fn sphere_marker_volume(radius: f32, cell_size: f32, count: usize) -> f32 {
    let (r, h) = (radius as f64, cell_size as f64);
    (PI * h / 3.0 / count as f64 * (12.0 * r * r + h * h)) as f32
}

/// Spherical angles `(theta, phi)` of `count` spiral points.
///
/// Points 0 and `count - 1` are the poles with `phi = 0`.
pub fn spiral_angles(count: usize) -> Vec<(f64, f64)> {
    let mut angles = Vec::with_capacity(count);
    if count == 0 {
        return angles;
    }
    if count == 1 {
        angles.push((PI, 0.0));
        return angles;
    }

    let n = count as f64;
    let mut phi = 0.0f64;
    for k in 0..count {
        let h = -1.0 + 2.0 * k as f64 / (n - 1.0);
        let theta = h.clamp(-1.0, 1.0).acos();
        if k == 0 || k == count - 1 {
            phi = 0.0;
        } else {
            phi = (phi + SPIRAL_CONSTANT / n.sqrt() / (1.0 - h * h).sqrt()) % (2.0 * PI);
        }
        angles.push((theta, phi));
    }
    angles
}

/// Unit directions of `count` spiral points.
pub fn spiral_directions(count: usize) -> Vec<Vec3> {
    spiral_angles(count)
        .into_iter()
        .map(|(theta, phi)| {
            Vec3::new(
                (theta.sin() * phi.cos()) as f32,
                (theta.sin() * phi.sin()) as f32,
                theta.cos() as f32,
            )
        })
        .collect()
}

/// Generate the markers of one sphere and append its body record.
///
/// Markers start with the rigid surface velocity of the body and zero force.
pub fn spawn_sphere(
    bodies: &mut BodySet,
    markers: &mut Markers,
    sphere: &SphereConfig,
    cell_size: f32,
) -> Result<BodyId, CouplingError> {
    if cell_size <= 0.0 || !cell_size.is_finite() {
        return Err(CouplingError::InvalidCellSize(cell_size));
    }
    if sphere.radius <= 0.0 || !sphere.radius.is_finite() {
        return Err(CouplingError::InvalidRadius(sphere.radius));
    }

    let count = sphere_marker_count(sphere.radius, cell_size);
    if count < 2 {
        return Err(CouplingError::TooFewMarkers {
            radius: sphere.radius,
            cell_size,
            count,
        });
    }
    let dv = sphere_marker_volume(sphere.radius, cell_size, count);

    log::info!(
        "Generating sphere at {:?}: radius {}, {} markers, dv {:.4e}",
        sphere.center,
        sphere.radius,
        count,
        dv
    );

    let body_id = BodyId(bodies.len());
    let first_marker_id = markers.next_id();

    let record = BodyRecord {
        location: sphere.center,
        velocity: sphere.velocity,
        angular_velocity: sphere.angular_velocity,
        orientation: Vec3::ZERO,
        radius: sphere.radius,
        density: sphere.density,
        first_marker_id,
        marker_count: count,
        marker_volume: dv,
    };

    markers.list.reserve(count);
    for dir in spiral_directions(count) {
        let anchor = sphere.radius * dir;
        let position = sphere.center + anchor;
        markers.spawn(body_id, position, anchor);
        if let Some(m) = markers.list.last_mut() {
            m.velocity = record.surface_velocity(position);
        }
    }

    Ok(bodies.insert(record))
}
