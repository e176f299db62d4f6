//! Persisted calibration state.
//!
//! The only value the core persists is the inclinometer zero offset, keyed
//! by installation. The pipeline talks to an injected store so the core
//! stays decoupled from any specific storage mechanism.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Key-value contract for the persisted zero offset.
pub trait CalibrationStore {
    /// Loads the stored offset, `None` on a fresh installation.
    fn load(&self) -> Result<Option<f32>>;

    /// Persists a new offset.
    fn save(&mut self, offset_deg: f32) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CalibrationFile {
    zero_offset_deg: f32,
}

/// JSON-file-backed store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CalibrationStore for JsonFileStore {
    fn load(&self) -> Result<Option<f32>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading calibration file {:?}", self.path))?;
        let file: CalibrationFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing calibration file {:?}", self.path))?;
        if !file.zero_offset_deg.is_finite() {
            warn!("stored zero offset is not finite, ignoring");
            return Ok(None);
        }
        Ok(Some(file.zero_offset_deg))
    }

    fn save(&mut self, offset_deg: f32) -> Result<()> {
        let raw = serde_json::to_string_pretty(&CalibrationFile {
            zero_offset_deg: offset_deg,
        })?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing calibration file {:?}", self.path))
    }
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    offset_deg: Option<f32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset_deg: f32) -> Self {
        Self {
            offset_deg: Some(offset_deg),
        }
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self) -> Result<Option<f32>> {
        Ok(self.offset_deg)
    }

    fn save(&mut self, offset_deg: f32) -> Result<()> {
        self.offset_deg = Some(offset_deg);
        Ok(())
    }
}
