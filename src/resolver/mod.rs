//! Layered hyperparameter resolution
//!
//! Precedence, highest first: CLI `--param` values, profile params, model
//! defaults. Defaults are never materialized here; the estimator factory
//! fills in whatever is left unset.
//!
//! CLI values stay raw strings and profile values stay typed. They live in
//! separate maps so the caller validates each with the right routine.

use crate::error::Result;
use crate::hyperparams::{HyperparamValidator, ParamValue, TypedHyperparameters};
use crate::params::RawParams;
use crate::profiles::ProfileRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Where a resolved parameter came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cli,
    Profile,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cli => write!(f, "cli"),
            Source::Profile => write!(f, "profile"),
        }
    }
}

/// Provenance record for one resolved parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSource {
    pub name: String,
    pub value: ParamValue,
    pub source: Source,
}

/// Identity of the profile a run was seeded from.
///
/// All three fields travel together, so a partial set cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub name: String,
    pub version: String,
    pub expanded_parameters_hash: String,
}

/// Result of merging CLI params over a profile
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Effective family; a profile's family replaces the caller's
    pub model_family: String,
    /// Profile-sourced values, already typed
    pub typed_params: BTreeMap<String, ParamValue>,
    /// CLI-sourced values, still raw strings, in input order
    pub raw_params: RawParams,
    pub param_sources: BTreeMap<String, ParamSource>,
    pub profile: Option<ProfileInfo>,
}

impl ResolvedConfig {
    /// Merged view: CLI strings (as `Str`) over profile values
    pub fn hyperparameters(&self) -> BTreeMap<String, ParamValue> {
        let mut merged = self.typed_params.clone();
        for (name, raw) in &self.raw_params {
            merged.insert(name.clone(), ParamValue::Str(raw.clone()));
        }
        merged
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }

    /// Validate both maps and produce the typed set for the estimator.
    ///
    /// Profile values pass through [`HyperparamValidator::check_typed`];
    /// CLI strings through [`HyperparamValidator::validate_and_convert`].
    pub fn into_typed(&self, validator: &HyperparamValidator) -> Result<TypedHyperparameters> {
        let mut typed = TypedHyperparameters::new();
        for (name, value) in &self.typed_params {
            let checked = validator.check_typed(&self.model_family, name, value)?;
            typed.insert(name.clone(), checked);
        }
        typed.extend(validator.validate_and_convert(&self.model_family, &self.raw_params)?);
        Ok(typed)
    }
}

/// Resolves CLI params and an optional profile into a [`ResolvedConfig`]
#[derive(Debug, Clone, Default)]
pub struct ParamResolver {
    registry: ProfileRegistry,
}

impl ParamResolver {
    pub fn new(registry: ProfileRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Merge CLI params over a profile.
    ///
    /// Fails only on an unknown profile name; parameter content is the
    /// validator's concern.
    pub fn resolve(
        &self,
        model_family: &str,
        cli_params: Option<&RawParams>,
        profile_name: Option<&str>,
    ) -> Result<ResolvedConfig> {
        let mut config = ResolvedConfig {
            model_family: model_family.to_string(),
            typed_params: BTreeMap::new(),
            raw_params: RawParams::new(),
            param_sources: BTreeMap::new(),
            profile: None,
        };

        if let Some(name) = profile_name {
            let expanded = self.registry.expand(name)?;
            if expanded.model_family != model_family {
                debug!(
                    requested = model_family,
                    profile = name,
                    effective = %expanded.model_family,
                    "Profile overrides model family"
                );
            }
            config.model_family = expanded.model_family;

            for (param, value) in expanded.params {
                config.param_sources.insert(
                    param.clone(),
                    ParamSource {
                        name: param.clone(),
                        value: value.clone(),
                        source: Source::Profile,
                    },
                );
                config.typed_params.insert(param, value);
            }

            config.profile = Some(ProfileInfo {
                name: expanded.profile_name,
                version: expanded.profile_version,
                expanded_parameters_hash: expanded.expanded_parameters_hash,
            });
        }

        if let Some(cli) = cli_params {
            for (param, raw) in cli {
                // A CLI value replaces the profile entry, source tag included
                config.typed_params.remove(param);
                config.param_sources.insert(
                    param.clone(),
                    ParamSource {
                        name: param.clone(),
                        value: ParamValue::Str(raw.clone()),
                        source: Source::Cli,
                    },
                );
                config.raw_params.insert(param.clone(), raw.clone());
            }
        }

        debug!(
            model_family = %config.model_family,
            params = config.param_sources.len(),
            "Resolved hyperparameters"
        );
        Ok(config)
    }
}

/// Resolve against the built-in profile registry
pub fn resolve_config(
    model_family: &str,
    cli_params: Option<&RawParams>,
    profile_name: Option<&str>,
) -> Result<ResolvedConfig> {
    ParamResolver::default().resolve(model_family, cli_params, profile_name)
}

/// Parameter provenance sorted by name
pub fn get_param_provenance(config: &ResolvedConfig) -> Vec<ParamSource> {
    // BTreeMap iteration is already name-ordered
    config.param_sources.values().cloned().collect()
}
