//! RunForge CLI
//!
//! JSON-producing commands write canonical JSON to stdout and nothing
//! else, so callers can parse it directly. Human-readable output from
//! `train` and `profiles` goes to stdout as well; logs go to stderr.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::artifacts::{inspect_artifact, read_run_metadata, to_canonical_pretty, RUNFORGE_VERSION};
use crate::config::RunnerSettings;
use crate::data::{inspect_dataset, LABEL_COLUMN};
use crate::params::parse_params;
use crate::profiles::ProfileRegistry;
use crate::provenance::{ProvenanceStore, RUNFORGE_DIR_NAME};
use crate::training::{ModelFamily, RunOutcome, TrainRequest, TrainingRunner};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString    { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    print!("{}", to_canonical_pretty(value)?);
    Ok(())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "runforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic, auditable training runs with versioned JSON artifacts")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a classifier on a CSV dataset
    Train {
        /// Training preset ID
        #[arg(long, value_parser = ["std-train", "hq-train"])]
        preset: String,

        /// Output directory for run artifacts
        #[arg(long)]
        out: PathBuf,

        /// Random seed (defaults to the preset seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Device requested by the caller
        #[arg(long, value_parser = ["cpu", "cuda"])]
        device: String,

        /// Model family (logistic_regression, random_forest, linear_svc)
        #[arg(long)]
        model: Option<String>,

        /// Training profile name
        #[arg(long)]
        profile: Option<String>,

        /// Hyperparameter override, repeatable (name=value)
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// CSV dataset (overrides RUNFORGE_DATASET)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Inspect a dataset without training
    Inspect {
        /// Path to CSV dataset
        #[arg(long)]
        dataset: PathBuf,

        /// Expected label column name
        #[arg(long, default_value = LABEL_COLUMN)]
        label: String,
    },

    /// Inspect a model artifact (read-only)
    InspectArtifact {
        /// Path to model.pkl
        #[arg(long)]
        artifact: PathBuf,

        /// Base path for the relative artifact path
        #[arg(long)]
        base_path: Option<PathBuf>,
    },

    /// Show run metadata
    Metadata {
        /// Show the latest run
        #[arg(long, conflicts_with = "run_id", required_unless_present = "run_id")]
        latest: bool,

        /// Show a specific run
        #[arg(long)]
        run_id: Option<String>,

        /// Path to the .runforge directory
        #[arg(long, default_value = RUNFORGE_DIR_NAME)]
        runforge_dir: PathBuf,
    },

    /// List training profiles or show one
    Profiles {
        /// Profile to show as JSON
        #[arg(long)]
        name: Option<String>,
    },

    /// List runs recorded in the provenance index
    Runs {
        /// Only runs trained on this dataset fingerprint
        #[arg(long)]
        fingerprint: Option<String>,

        /// Path to the .runforge directory
        #[arg(long, default_value = RUNFORGE_DIR_NAME)]
        runforge_dir: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    preset: &str,
    out: &Path,
    seed: Option<u64>,
    device: &str,
    model: Option<&str>,
    profile: Option<&str>,
    params: &[String],
    dataset: Option<&Path>,
) -> anyhow::Result<()> {
    let cli_params = parse_params(params)?;

    let mut settings = RunnerSettings::from_env()?;
    if let Some(dataset) = dataset {
        settings = settings.with_dataset(dataset);
    }

    if let (Some(requested), Some(profile)) = (model, profile) {
        let info = ProfileRegistry::builtin().info(profile)?;
        if info.model_family != requested {
            eprintln!(
                "  {} profile '{}' uses model '{}'; ignoring --model {}",
                "warning:".yellow().bold(),
                profile,
                info.model_family,
                requested
            );
        }
    }

    let mut request = TrainRequest::new(preset, out)
        .with_device(device)
        .with_model_family(model.unwrap_or(ModelFamily::LogisticRegression.as_str()))
        .with_cli_params(cli_params);
    if let Some(seed) = seed {
        request = request.with_seed(seed);
    }
    if let Some(profile) = profile {
        request = request.with_profile(profile);
    }

    let outcome = TrainingRunner::new(settings).run(&request)?;
    print_train_summary(&outcome);
    Ok(())
}

fn print_train_summary(outcome: &RunOutcome) {
    section(&format!("RunForge v{}", RUNFORGE_VERSION));
    kv("Run ID", &outcome.run_id);
    kv(
        "Model",
        &format!("{} ({})", outcome.model_family.display_name(), outcome.model_family),
    );
    if let Some(profile) = &outcome.profile_name {
        kv("Profile", profile);
    }
    kv("Seed", &outcome.seed.to_string());
    kv("Validation Accuracy", &format!("{:.4}", outcome.accuracy));
    kv("Metrics Profile", &outcome.metrics_profile);
    kv("Total Samples", &outcome.num_samples.to_string());
    kv("Features", &outcome.num_features.to_string());
    kv("Dropped Rows", &outcome.rows_dropped.to_string());
    kv("Model saved", &outcome.model_path.display().to_string());
    kv("Metrics saved", &outcome.metrics_path.display().to_string());
    match &outcome.provenance_index {
        Some(index) => kv("Provenance", &index.display().to_string()),
        None => kv("Provenance", "not recorded"),
    }

    if !outcome.diagnostics.is_empty() {
        println!();
        for diagnostic in &outcome.diagnostics {
            println!("  {} {}", dim("·"), muted(&diagnostic.to_string()));
        }
    }

    println!();
    println!("  {} {}", ok("✓"), "Training complete".white());
    println!();
}

pub fn cmd_inspect(dataset: &Path, label: &str) -> anyhow::Result<()> {
    let result = inspect_dataset(dataset, label)?;
    print_json(&result)?;
    if !result.label_present {
        anyhow::bail!(
            "Label column '{}' not found. Available columns: {}",
            label,
            result.columns.join(", ")
        );
    }
    Ok(())
}

pub fn cmd_inspect_artifact(artifact: &Path, base_path: Option<&Path>) -> anyhow::Result<()> {
    let result = inspect_artifact(artifact, base_path)?;
    print_json(&result)
}

pub fn cmd_metadata(latest: bool, run_id: Option<&str>, runforge_dir: &Path) -> anyhow::Result<()> {
    let store = ProvenanceStore::new(runforge_dir);

    let entry = match (latest, run_id) {
        (true, _) => store
            .latest()?
            .ok_or_else(|| anyhow::anyhow!("No runs found."))?,
        (false, Some(id)) => store
            .by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("Run not found: {}", id))?,
        (false, None) => anyhow::bail!("Either --latest or --run-id is required"),
    };

    let run_json = runforge_dir.join(&entry.run_dir);
    match run_json.parent().filter(|_| run_json.exists()) {
        Some(run_dir) => print_json(&read_run_metadata(run_dir)?),
        None => print_json(&entry),
    }
}

pub fn cmd_profiles(name: Option<&str>) -> anyhow::Result<()> {
    let registry = ProfileRegistry::builtin();

    if let Some(name) = name {
        return print_json(&registry.info(name)?);
    }

    section("Profiles");
    println!(
        "  {:<12} {:<8} {:<22} {}",
        muted("Name"),
        muted("Version"),
        muted("Model"),
        muted("Description")
    );
    println!("  {}", dim(&"─".repeat(56)));
    for name in registry.list() {
        let profile = registry.info(&name)?;
        println!(
            "  {:<12} {:<8} {:<22} {}",
            profile.name.cyan(),
            profile.version,
            profile.model_family,
            dim(&profile.description)
        );
    }
    println!();
    Ok(())
}

pub fn cmd_runs(fingerprint: Option<&str>, runforge_dir: &Path) -> anyhow::Result<()> {
    let store = ProvenanceStore::new(runforge_dir);
    let runs = match fingerprint {
        Some(fp) => store.by_fingerprint(fp)?,
        None => store.list()?,
    };
    print_json(&runs)
}

/// Dispatch a parsed command
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train { preset, out, seed, device, model, profile, params, dataset } => cmd_train(
            &preset,
            &out,
            seed,
            &device,
            model.as_deref(),
            profile.as_deref(),
            &params,
            dataset.as_deref(),
        ),
        Commands::Inspect { dataset, label } => cmd_inspect(&dataset, &label),
        Commands::InspectArtifact { artifact, base_path } => cmd_inspect_artifact(&artifact, base_path.as_deref()),
        Commands::Metadata { latest, run_id, runforge_dir } => cmd_metadata(latest, run_id.as_deref(), &runforge_dir),
        Commands::Profiles { name } => cmd_profiles(name.as_deref()),
        Commands::Runs { fingerprint, runforge_dir } => cmd_runs(fingerprint.as_deref(), &runforge_dir),
    }
}
