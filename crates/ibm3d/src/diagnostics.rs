//! Text dumps of marker state and per-step body trajectories.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::body::{BodyId, BodySet};
use crate::marker::Markers;
use crate::serde_utils::vec3;

/// `dir/markers_00042.txt` for tag 42.
pub fn marker_dump_path(dir: &Path, tag: u64) -> PathBuf {
    dir.join(format!("markers_{:05}.txt", tag))
}

/// Write one line per marker: id, body, position, velocity, force.
pub fn dump_markers<W: Write>(out: &mut W, markers: &Markers, tag: u64) -> io::Result<()> {
    writeln!(out, "# step {} markers {}", tag, markers.len())?;
    writeln!(out, "# id body x y z u v w fx fy fz")?;
    for m in markers.iter() {
        let (p, u, f) = (m.position, m.velocity, m.force);
        writeln!(
            out,
            "{} {} {:e} {:e} {:e} {:e} {:e} {:e} {:e} {:e} {:e}",
            m.id, m.body.0, p.x, p.y, p.z, u.x, u.y, u.z, f.x, f.y, f.z
        )?;
    }
    Ok(())
}

/// Dump markers to `markers_NNNNN.txt` under `dir` and return the file path.
pub fn write_marker_dump(dir: &Path, markers: &Markers, tag: u64) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = marker_dump_path(dir, tag);
    let mut out = BufWriter::new(File::create(&path)?);
    dump_markers(&mut out, markers, tag)?;
    out.flush()?;
    log::debug!("Wrote {} markers to {}", markers.len(), path.display());
    Ok(path)
}

/// Kinematics of one body at one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub step: u64,
    pub time: f32,
    pub body: BodyId,
    #[serde(with = "vec3")]
    pub location: Vec3,
    #[serde(with = "vec3")]
    pub velocity: Vec3,
    #[serde(with = "vec3")]
    pub angular_velocity: Vec3,
    #[serde(with = "vec3")]
    pub orientation: Vec3,
}

/// Body kinematics recorded over a run.
#[derive(Clone, Debug, Default)]
pub struct BodyTrajectory {
    pub rows: Vec<TrajectoryRow>,
}

impl BodyTrajectory {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append one row per body.
    pub fn record(&mut self, step: u64, time: f32, bodies: &BodySet) {
        self.rows.extend(bodies.iter().map(|(id, b)| TrajectoryRow {
            step,
            time,
            body: id,
            location: b.location,
            velocity: b.velocity,
            angular_velocity: b.angular_velocity,
            orientation: b.orientation,
        }));
    }

    /// Rows of a single body in recording order.
    pub fn of_body(&self, body: BodyId) -> impl Iterator<Item = &TrajectoryRow> {
        self.rows.iter().filter(move |r| r.body == body)
    }

    /// One JSON object per line.
    pub fn write_json_lines(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut out = BufWriter::new(File::create(path)?);
        for row in &self.rows {
            serde_json::to_writer(&mut out, row)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn read_json_lines(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let mut rows = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            rows.push(serde_json::from_str(line)?);
        }
        Ok(Self { rows })
    }
}
