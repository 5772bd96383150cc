//! Marker-grid transfer functions.
//!
//! Interpolation: gather field velocity to markers with the 5x5x5 delta stencil.
//! Spreading: scatter marker force to the same stencil of field cells.
//!
//! Both passes run in parallel over markers. Interpolation only writes the
//! marker's own accumulator. Spreading writes shared cells, so every
//! contribution goes through an atomic add (or a private per-worker buffer
//! with [`SpreadStrategy::Privatized`]).

use glam::Vec3;
use rayon::prelude::*;
use std::sync::atomic::Ordering;

use crate::atomic::AtomicF32;
use crate::body::BodySet;
use crate::config::SpreadStrategy;
use crate::error::CouplingError;
use crate::field::Field3D;
use crate::marker::{Marker, Markers};

/// Pre-allocated accumulators for the atomic spread (avoids allocation each step).
pub struct TransferBuffers {
    pub fx: Vec<AtomicF32>,
    pub fy: Vec<AtomicF32>,
    pub fz: Vec<AtomicF32>,
}

impl TransferBuffers {
    /// Create buffers sized for the given field.
    pub fn new(field: &Field3D) -> Self {
        let n = field.len();
        let alloc = || (0..n).map(|_| AtomicF32::new(0.0)).collect::<Vec<_>>();
        Self {
            fx: alloc(),
            fy: alloc(),
            fz: alloc(),
        }
    }

    pub fn len(&self) -> usize {
        self.fx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fx.is_empty()
    }

    /// Clear all buffers to zero.
    pub fn clear(&self) {
        for buf in [&self.fx, &self.fy, &self.fz] {
            buf.par_iter().for_each(|a| a.store(0.0, Ordering::Relaxed));
        }
    }
}

/// Fail on the first marker whose stencil leaves the stored region.
///
/// Markers of unknown bodies take no part in either transfer and are not
/// checked.
pub fn check_stencils(
    field: &Field3D,
    markers: &Markers,
    bodies: &BodySet,
) -> Result<(), CouplingError> {
    markers.list.par_iter().try_for_each(|m| {
        if bodies.get(m.body).is_none() {
            return Ok(());
        }
        let stencil = field.stencil(m.position);
        match field.first_missing_cell(&stencil) {
            Some(cell) => Err(CouplingError::StencilOutsideField {
                marker_id: m.id,
                body: m.body,
                cell,
            }),
            None => Ok(()),
        }
    })
}

/// Velocity at `position` gathered from channels `first..first + 3`.
///
/// The caller guarantees the stencil is contained in the field.
pub fn interpolate_at(field: &Field3D, first: usize, position: Vec3) -> Vec3 {
    let stencil = field.stencil(position);
    let cell_volume = field.cell_volume();
    let (u, v, w) = (
        field.channel(first),
        field.channel(first + 1),
        field.channel(first + 2),
    );

    let mut sum = Vec3::ZERO;
    for (cell, weight) in stencil.cells() {
        if let Some(idx) = field.index(cell) {
            let wv = weight * cell_volume;
            sum += wv * Vec3::new(u[idx], v[idx], w[idx]);
        }
    }
    sum
}

/// Transfer field velocity to markers (grid to particle).
///
/// Overwrites every marker's `velocity` with the kernel-weighted average of
/// channels `first..first + 3`. Markers of unknown bodies keep their velocity.
/// The field is not modified.
pub fn interpolate_velocities(
    field: &Field3D,
    first: usize,
    markers: &mut Markers,
    bodies: &BodySet,
) -> Result<(), CouplingError> {
    field.check_vector_channels(first)?;
    check_stencils(field, markers, bodies)?;

    let orphans: usize = markers
        .list
        .par_iter_mut()
        .map(|m| {
            if bodies.get(m.body).is_none() {
                return 1;
            }
            m.velocity = interpolate_at(field, first, m.position);
            0
        })
        .sum();
    if orphans > 0 {
        log::warn!(
            "{} marker(s) reference no known body and were not interpolated",
            orphans
        );
    }
    Ok(())
}

/// Transfer marker forces to the field (particle to grid).
///
/// Channels `first..first + 3` are reset to zero, then every marker adds
/// `delta * force * dv` to each cell of its stencil, where `dv` is the marker
/// volume element of its body. Markers of unknown bodies contribute nothing.
pub fn spread_forces(
    field: &mut Field3D,
    first: usize,
    markers: &Markers,
    bodies: &BodySet,
    strategy: SpreadStrategy,
    buffers: &TransferBuffers,
) -> Result<(), CouplingError> {
    field.check_vector_channels(first)?;
    check_stencils(field, markers, bodies)?;
    if buffers.len() != field.len() {
        return Err(CouplingError::FieldMismatch(format!(
            "transfer buffers hold {} cells, field has {}",
            buffers.len(),
            field.len()
        )));
    }

    // Reset happens before any contribution of this step
    field.reset_vector(first);

    match strategy {
        SpreadStrategy::Atomic => {
            buffers.clear();
            let target: &Field3D = field;
            markers.list.par_iter().for_each(|m| {
                if let Some(dv) = marker_volume(bodies, m) {
                    spread_marker(target, m, dv, |idx, f| {
                        buffers.fx[idx].fetch_add(f.x, Ordering::Relaxed);
                        buffers.fy[idx].fetch_add(f.y, Ordering::Relaxed);
                        buffers.fz[idx].fetch_add(f.z, Ordering::Relaxed);
                    });
                }
            });
            for (a, buf) in [&buffers.fx, &buffers.fy, &buffers.fz].into_iter().enumerate() {
                field
                    .channel_mut(first + a)
                    .par_iter_mut()
                    .zip(buf.par_iter())
                    .for_each(|(cell, acc)| *cell += acc.load(Ordering::Relaxed));
            }
        }
        SpreadStrategy::Privatized => {
            let n = field.len();
            let target: &Field3D = field;
            let merged = markers
                .list
                .par_iter()
                .fold(
                    || vec![Vec3::ZERO; n],
                    |mut acc, m| {
                        if let Some(dv) = marker_volume(bodies, m) {
                            spread_marker(target, m, dv, |idx, f| acc[idx] += f);
                        }
                        acc
                    },
                )
                .reduce(
                    || vec![Vec3::ZERO; n],
                    |mut a, b| {
                        a.iter_mut().zip(&b).for_each(|(x, y)| *x += *y);
                        a
                    },
                );
            for a in 0..3 {
                field
                    .channel_mut(first + a)
                    .par_iter_mut()
                    .zip(merged.par_iter())
                    .for_each(|(cell, f)| *cell += f[a]);
            }
        }
    }

    Ok(())
}

#[inline]
fn marker_volume(bodies: &BodySet, m: &Marker) -> Option<f32> {
    bodies.get(m.body).map(|b| b.marker_volume)
}

/// Visit the `(cell index, force density)` contributions of one marker.
#[inline]
fn spread_marker(field: &Field3D, m: &Marker, dv: f32, mut add: impl FnMut(usize, Vec3)) {
    let stencil = field.stencil(m.position);
    let scaled = m.force * dv;
    for (cell, weight) in stencil.cells() {
        if weight == 0.0 {
            continue;
        }
        if let Some(idx) = field.index(cell) {
            add(idx, weight * scaled);
        }
    }
}
