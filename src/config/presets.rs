//! Training presets
//!
//! Presets carry the lowest-priority training defaults. Profiles and
//! `--param` values sit on top of them.

use crate::error::{Result, RunForgeError};
use serde::Serialize;

/// Default training knobs for a preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetDefaults {
    pub epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    pub solver: &'static str,
    pub max_iter: usize,
    pub seed: u64,
    pub device: &'static str,
}

impl PresetDefaults {
    /// Inverse regularization strength. Zero regularization maps to a very
    /// large C.
    pub fn c(&self) -> f64 {
        if self.regularization > 0.0 {
            1.0 / self.regularization
        } else {
            1e6
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub defaults: PresetDefaults,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        id: "std-train",
        name: "Standard Training",
        defaults: PresetDefaults {
            epochs: 50,
            learning_rate: 0.01,
            regularization: 1.0,
            solver: "lbfgs",
            max_iter: 200,
            seed: 42,
            device: "cpu",
        },
    },
    Preset {
        id: "hq-train",
        name: "High Quality Training",
        defaults: PresetDefaults {
            epochs: 200,
            learning_rate: 0.005,
            regularization: 0.5,
            solver: "lbfgs",
            max_iter: 500,
            seed: 42,
            device: "cpu",
        },
    },
];

pub fn get_preset(id: &str) -> Result<&'static Preset> {
    PRESETS
        .iter()
        .find(|preset| preset.id == id)
        .ok_or_else(|| RunForgeError::ConfigError(format!("Unknown preset: {}", id)))
}

pub fn preset_ids() -> Vec<&'static str> {
    PRESETS.iter().map(|preset| preset.id).collect()
}
