//! RunForge - deterministic, auditable training runs
//!
//! A run takes a CSV dataset, a preset and an optional profile, trains one
//! of three classifier families with a fixed seed and writes a directory of
//! versioned JSON artifacts next to the model.
//!
//! # Modules
//!
//! ## Configuration
//! - [`params`] - `name=value` CLI parameter parsing
//! - [`hyperparams`] - Per-family hyperparameter schemas and typed values
//! - [`profiles`] - Named, versioned hyperparameter bundles
//! - [`resolver`] - Precedence resolution with per-parameter provenance
//! - [`config`] - Presets and environment-driven runner settings
//!
//! ## Data and training
//! - [`data`] - CSV loading, fingerprinting and inspection
//! - [`diagnostics`] - Structured, non-fatal findings
//! - [`preprocessing`] - Feature scaling
//! - [`training`] - Estimators, pipeline and the training runner
//!
//! ## Outputs
//! - [`artifacts`] - run.json, metrics, interpretability and inspection
//! - [`provenance`] - Append-only run index
//! - [`cli`] - Command-line interface

pub mod error;

pub mod config;
pub mod hyperparams;
pub mod params;
pub mod profiles;
pub mod resolver;

pub mod data;
pub mod diagnostics;
pub mod preprocessing;
pub mod training;

pub mod artifacts;
pub mod cli;
pub mod provenance;

pub use error::{Result, RunForgeError};

/// Version string recorded in every run
pub const VERSION: &str = artifacts::RUNFORGE_VERSION;
