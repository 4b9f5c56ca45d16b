//! Integration test: profiles → resolver → validator

use runforge::hyperparams::{HyperparamValidator, ParamValue};
use runforge::params::parse_params;
use runforge::profiles::ProfileRegistry;
use runforge::resolver::{get_param_provenance, resolve_config, Source};
use runforge::RunForgeError;

#[test]
fn test_cli_overrides_profile_value() {
    let cli = parse_params(&["max_iter=300"]).unwrap();
    let config = resolve_config("logistic_regression", Some(&cli), Some("fast")).unwrap();

    let typed = config.into_typed(&HyperparamValidator::builtin()).unwrap();
    assert_eq!(typed.get("max_iter"), Some(&ParamValue::Int(300)));

    let provenance = get_param_provenance(&config);
    assert_eq!(provenance.len(), 1);
    assert_eq!(provenance[0].name, "max_iter");
    assert_eq!(provenance[0].source, Source::Cli);
}

#[test]
fn test_profile_family_wins() {
    let config = resolve_config("logistic_regression", None, Some("thorough")).unwrap();
    assert_eq!(config.model_family, "random_forest");

    let typed = config.into_typed(&HyperparamValidator::builtin()).unwrap();
    assert_eq!(typed.get("n_estimators"), Some(&ParamValue::Int(200)));
    assert_eq!(typed.get("max_depth"), Some(&ParamValue::Int(10)));

    let profile = config.profile.as_ref().unwrap();
    assert_eq!(profile.name, "thorough");
    assert_eq!(profile.version, "1.0");
    assert_eq!(profile.expanded_parameters_hash.len(), 64);
}

#[test]
fn test_profile_hash_ignores_cli_overrides() {
    let plain = resolve_config("logistic_regression", None, Some("fast")).unwrap();
    let cli = parse_params(&["C=2.0"]).unwrap();
    let overridden = resolve_config("logistic_regression", Some(&cli), Some("fast")).unwrap();

    assert_eq!(
        plain.profile.unwrap().expanded_parameters_hash,
        overridden.profile.unwrap().expanded_parameters_hash
    );
}

#[test]
fn test_unknown_profile_lists_available() {
    let err = resolve_config("logistic_regression", None, Some("turbo")).unwrap_err();
    assert!(matches!(err, RunForgeError::UnknownProfile { .. }));
    assert!(err.to_string().contains("default, fast, thorough"));
}

#[test]
fn test_cli_param_for_other_family_is_rejected() {
    let cli = parse_params(&["n_estimators=10"]).unwrap();
    let config = resolve_config("logistic_regression", Some(&cli), None).unwrap();

    let err = config.into_typed(&HyperparamValidator::builtin()).unwrap_err();
    assert!(matches!(err, RunForgeError::UnknownParam { .. }));
}

#[test]
fn test_every_builtin_profile_validates() {
    let registry = ProfileRegistry::builtin();
    let validator = HyperparamValidator::builtin();
    for name in registry.list() {
        let config = resolve_config("logistic_regression", None, Some(&name)).unwrap();
        assert!(config.into_typed(&validator).is_ok(), "profile {} failed", name);
    }
}

#[test]
fn test_first_bad_param_in_command_line_order_is_reported() {
    let cli = parse_params(&["max_iter=abc", "C=-1"]).unwrap();
    let config = resolve_config("logistic_regression", Some(&cli), None).unwrap();

    let err = config.into_typed(&HyperparamValidator::builtin()).unwrap_err();
    match err {
        RunForgeError::TypeParseError { name, value, .. } => {
            assert_eq!(name, "max_iter");
            assert_eq!(value, "abc");
        }
        other => panic!("expected TypeParseError for max_iter, got {other}"),
    }
}
