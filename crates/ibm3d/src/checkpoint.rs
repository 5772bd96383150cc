//! Save/restore of the coupling state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::body::BodySet;
use crate::marker::Marker;

/// Everything needed to resume a coupling run: bodies, markers and the step
/// counter. Fields are not included; they belong to the field solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingCheckpoint {
    pub step: u64,
    pub bodies: BodySet,
    pub markers: Vec<Marker>,
}

impl CouplingCheckpoint {
    /// Save checkpoint to JSON file
    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load checkpoint from JSON file
    pub fn load_json(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let checkpoint = serde_json::from_str(&json)?;
        Ok(checkpoint)
    }
}
