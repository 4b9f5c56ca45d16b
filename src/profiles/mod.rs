//! Named training profiles
//!
//! A profile is a versioned bundle of a model family plus hyperparameters.
//! Expanding a profile attaches a SHA-256 over its identity and params, so
//! a run records exactly which preset it started from.

use crate::artifacts::canonical::to_canonical_compact;
use crate::error::{Result, RunForgeError};
use crate::hyperparams::ParamValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Immutable named parameter bundle.
///
/// Bump `version` whenever `params` or `model_family` change for a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub version: String,
    pub model_family: String,
    pub params: BTreeMap<String, ParamValue>,
    pub description: String,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        model_family: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            model_family: model_family.into(),
            params: BTreeMap::new(),
            description: description.into(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// A profile resolved to its full field set plus integrity hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedProfile {
    pub profile_name: String,
    pub profile_version: String,
    pub model_family: String,
    pub params: BTreeMap<String, ParamValue>,
    pub expanded_parameters_hash: String,
}

/// Hashed identity of a profile. Field order here is irrelevant; the
/// canonical encoder sorts keys.
#[derive(Serialize)]
struct HashInput<'a> {
    model_family: &'a str,
    params: &'a BTreeMap<String, ParamValue>,
    profile_name: &'a str,
    profile_version: &'a str,
}

/// SHA-256 hex over the compact canonical JSON of a profile's identity
pub fn compute_profile_hash(profile: &Profile) -> Result<String> {
    let canonical = to_canonical_compact(&HashInput {
        model_family: &profile.model_family,
        params: &profile.params,
        profile_name: &profile.name,
        profile_version: &profile.version,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fixed catalog of profiles, looked up by name
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    /// The profiles shipped with RunForge
    pub fn builtin() -> Self {
        Self::from_profiles([
            Profile::new("default", "1.0", "logistic_regression", "Default settings, uses model defaults"),
            Profile::new("fast", "1.0", "logistic_regression", "Fast training with reduced iterations")
                .with_param("max_iter", 50i64),
            Profile::new("thorough", "1.0", "random_forest", "Thorough training with Random Forest ensemble")
                .with_param("n_estimators", 200i64)
                .with_param("max_depth", 10i64),
        ])
    }

    /// Registry over a substitute set of profiles. Later duplicates win.
    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
        }
    }

    /// Sorted profile names
    pub fn list(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| RunForgeError::UnknownProfile {
                name: name.to_string(),
                available: self.list(),
            })
    }

    /// Owned copy of a profile, for display
    pub fn info(&self, name: &str) -> Result<Profile> {
        self.get(name).cloned()
    }

    /// Expand a profile and hash it. The hash covers the raw profile,
    /// before any CLI override.
    pub fn expand(&self, name: &str) -> Result<ExpandedProfile> {
        let profile = self.get(name)?;
        let hash = compute_profile_hash(profile)?;
        debug!(profile = name, hash = %hash, "Expanded profile");

        Ok(ExpandedProfile {
            profile_name: profile.name.clone(),
            profile_version: profile.version.clone(),
            model_family: profile.model_family.clone(),
            params: profile.params.clone(),
            expanded_parameters_hash: hash,
        })
    }
}
