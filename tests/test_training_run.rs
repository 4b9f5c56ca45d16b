//! Integration test: dataset → train → artifacts → provenance

use chrono::DateTime;
use runforge::artifacts::{inspect_artifact, read_run_metadata};
use runforge::config::{RunClock, RunnerSettings};
use runforge::params::RawParams;
use runforge::provenance::ProvenanceStore;
use runforge::training::{ModelFamily, TrainRequest, TrainingRunner};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_dataset(dir: &Path) -> PathBuf {
    let path = dir.join("iris_like.csv");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "sepal,petal,width,label").unwrap();
    for i in 0..30 {
        let class = i % 3;
        writeln!(
            file,
            "{},{},{},{}",
            class as f64 * 2.0 + (i % 4) as f64 * 0.1,
            class as f64 * 1.5 - (i % 3) as f64 * 0.05,
            (i % 7) as f64 * 0.2,
            class
        )
        .unwrap();
    }
    path
}

fn runner(dataset: &Path) -> TrainingRunner {
    let clock = RunClock::Fixed(DateTime::parse_from_rfc3339("2024-03-05T08:09:10+00:00").unwrap());
    TrainingRunner::new(RunnerSettings::new().with_dataset(dataset).with_clock(clock))
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_run_inside_workspace_is_indexed() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let out = dir.path().join(".runforge").join("runs").join("first");

    let outcome = runner(&dataset)
        .run(&TrainRequest::new("std-train", &out).with_seed(42))
        .unwrap();
    assert!(outcome.provenance_index.is_some());

    let store = ProvenanceStore::new(dir.path().join(".runforge"));
    let latest = store.latest().unwrap().unwrap();
    assert_eq!(latest.run_id, outcome.run_id);
    assert_eq!(latest.run_dir, "runs/first/run.json");
    assert_eq!(latest.model_pkl, "runs/first/artifacts/model.pkl");

    let metadata = read_run_metadata(&out).unwrap();
    assert_eq!(metadata.run_id, outcome.run_id);
    assert_eq!(metadata.created_at, latest.created_at);
    assert_eq!(metadata.dataset.fingerprint_sha256, latest.dataset_fingerprint_sha256);
    assert_eq!(metadata.num_samples, 30);
    assert_eq!(metadata.num_features, 3);
    assert_eq!(metadata.model_family, "logistic_regression");
}

#[test]
fn test_multiclass_metrics_and_coefficients() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let out = dir.path().join("run");

    runner(&dataset)
        .run(&TrainRequest::new("std-train", &out).with_seed(3))
        .unwrap();

    let metrics = read_json(&out.join("metrics.v1.json"));
    assert_eq!(metrics["schema_version"], "metrics.v1");
    assert_eq!(metrics["metrics_profile"], "classification.multiclass.v1");
    assert_eq!(metrics["num_classes"], 3);
    assert!(metrics.get("roc_auc").is_none());

    let coefficients = read_json(&out.join("artifacts/linear_coefficients.v1.json"));
    assert_eq!(coefficients["num_classes"], 3);
    assert_eq!(coefficients["coefficients_by_class"].as_array().unwrap().len(), 3);

    let run = read_json(&out.join("run.json"));
    assert_eq!(run["linear_coefficients_artifact"], "artifacts/linear_coefficients.v1.json");
    assert!(run.get("feature_importance_artifact").is_none());
    assert!(run.get("profile_name").is_none());
}

#[test]
fn test_profile_selects_random_forest() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let out = dir.path().join("rf");

    let outcome = runner(&dataset)
        .run(
            &TrainRequest::new("std-train", &out)
                .with_seed(7)
                .with_model_family("logistic_regression")
                .with_profile("thorough"),
        )
        .unwrap();
    assert_eq!(outcome.model_family, ModelFamily::RandomForest);

    let run = read_json(&out.join("run.json"));
    assert_eq!(run["model_family"], "random_forest");
    assert_eq!(run["profile_name"], "thorough");
    assert_eq!(run["profile_version"], "1.0");
    assert_eq!(run["feature_importance_artifact"], "artifacts/feature_importance.v1.json");
    assert!(run.get("linear_coefficients_artifact").is_none());

    let sources: Vec<&str> = run["hyperparameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["source"].as_str().unwrap())
        .collect();
    assert!(sources.iter().all(|s| *s == "profile"));

    let importance = read_json(&out.join("artifacts/feature_importance.v1.json"));
    assert_eq!(importance["num_features"], 3);
    let total: f64 = importance["features_by_original_order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["importance"].as_f64().unwrap())
        .sum();
    assert!((total - 1.0).abs() < 1e-6);

    let index = read_json(&out.join("artifacts/interpretability.index.v1.json"));
    assert!(index["available_artifacts"].get("feature_importance_v1").is_some());
    assert!(index["available_artifacts"].get("linear_coefficients_v1").is_none());
}

#[test]
fn test_same_inputs_same_outputs() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let a = dir.path().join("a");
    let b = dir.path().join("b");

    let first = runner(&dataset).run(&TrainRequest::new("hq-train", &a).with_seed(11)).unwrap();
    let second = runner(&dataset).run(&TrainRequest::new("hq-train", &b).with_seed(11)).unwrap();

    assert_eq!(first.run_id, second.run_id);
    for file in ["metrics.json", "metrics.v1.json", "artifacts/linear_coefficients.v1.json"] {
        assert_eq!(
            fs::read_to_string(a.join(file)).unwrap(),
            fs::read_to_string(b.join(file)).unwrap(),
            "{} differs",
            file
        );
    }
}

#[test]
fn test_invalid_cli_param_writes_nothing() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let out = dir.path().join("bad");

    let mut params = RawParams::new();
    params.insert("max_iter", "lots");
    let err = runner(&dataset)
        .run(&TrainRequest::new("std-train", &out).with_cli_params(params))
        .unwrap_err();

    assert!(err.is_hyperparam_error());
    assert!(!out.join("run.json").exists());
}

#[test]
fn test_inspect_trained_artifact() {
    let dir = tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let out = dir.path().join("svc");

    runner(&dataset)
        .run(
            &TrainRequest::new("std-train", &out)
                .with_seed(5)
                .with_model_family("linear_svc"),
        )
        .unwrap();

    let inspection = inspect_artifact(&out.join("artifacts/model.pkl"), Some(&out)).unwrap();
    assert_eq!(inspection.artifact_path, "artifacts/model.pkl");
    assert_eq!(inspection.step_count, 2);
    assert!(inspection.has_preprocessing);
}
