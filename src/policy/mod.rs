//! Reward policy configuration
//!
//! The policy is an externally owned JSON document. Required keys are
//! optional at parse time: a policy missing one still loads, and the gap is
//! reported as a configuration error when a decision needs it.

mod store;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::Persona;

pub use self::store::PolicyStore;

/// Policy keys that must be present for any decision
pub const REQUIRED_KEYS: [&str; 6] = [
    "xp_per_rupee",
    "max_xp_per_txn",
    "persona_multipliers",
    "daily_cac_limit",
    "feature_flags",
    "policy_version",
];

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("Missing required config key: {0}")]
    MissingKey(&'static str),

    #[error("Persona '{persona}' not found in {map} config")]
    UnknownPersona {
        map: &'static str,
        persona: Persona,
    },

    #[error("{0} must be a non-negative number")]
    Negative(String),

    #[error("Failed to load policy: {0}")]
    Load(String),
}

/// Feature flags steering reward selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub prefer_xp: bool,
    #[serde(default)]
    pub prefer_gold: bool,
}

/// Cache TTLs, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheTtls {
    #[serde(default = "default_day")]
    pub idempotency_ttl: u64,
    #[serde(default = "default_month")]
    pub persona_ttl: u64,
    #[serde(default = "default_day")]
    pub cac_ttl: u64,
}

fn default_day() -> u64 {
    86_400
}

fn default_month() -> u64 {
    2_592_000
}

fn default_gold_reward() -> f64 {
    50.0
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            idempotency_ttl: default_day(),
            persona_ttl: default_month(),
            cac_ttl: default_day(),
        }
    }
}

/// Reward policy as supplied by operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Experience points per currency unit
    pub xp_per_rupee: Option<f64>,
    pub max_xp_per_txn: Option<f64>,
    pub persona_multipliers: Option<HashMap<String, f64>>,
    pub daily_cac_limit: Option<HashMap<String, f64>>,
    #[serde(default = "default_gold_reward")]
    pub gold_reward_value: f64,
    pub feature_flags: Option<FeatureFlags>,
    pub policy_version: Option<String>,
    #[serde(default)]
    pub cache: CacheTtls,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let personas = |new: f64, returning: f64, power: f64| {
            HashMap::from([
                (Persona::New.as_str().to_string(), new),
                (Persona::Returning.as_str().to_string(), returning),
                (Persona::Power.as_str().to_string(), power),
            ])
        };

        Self {
            xp_per_rupee: Some(1.0),
            max_xp_per_txn: Some(500.0),
            persona_multipliers: Some(personas(1.5, 1.2, 1.0)),
            daily_cac_limit: Some(personas(200.0, 150.0, 100.0)),
            gold_reward_value: default_gold_reward(),
            feature_flags: Some(FeatureFlags {
                prefer_xp: true,
                prefer_gold: false,
            }),
            policy_version: Some("v1".to_string()),
            cache: CacheTtls::default(),
        }
    }
}

/// Policy values resolved for one persona
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaPolicy {
    pub persona: Persona,
    pub xp_per_unit: f64,
    pub max_xp_per_txn: i64,
    pub multiplier: f64,
    pub daily_cap: i64,
    pub gold_value: i64,
    pub flags: FeatureFlags,
    pub policy_version: String,
    pub ttls: CacheTtls,
}

impl PersonaPolicy {
    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.ttls.idempotency_ttl)
    }

    pub fn persona_ttl(&self) -> Duration {
        Duration::from_secs(self.ttls.persona_ttl)
    }

    pub fn cac_ttl(&self) -> Duration {
        Duration::from_secs(self.ttls.cac_ttl)
    }
}

impl PolicyConfig {
    /// Parse a policy document
    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(raw).map_err(|e| PolicyError::Load(e.to_string()))
    }

    /// Read and parse a policy file
    ///
    /// Policies are JSON. YAML files from older deployments are refused with
    /// a message naming the file, so the store falls back to defaults loudly.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        if matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        ) {
            return Err(PolicyError::Load(format!(
                "{}: YAML policy files are not supported, convert the policy to JSON",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Structural check: required keys present, persona in both maps
    pub fn validate_for(&self, persona: Persona) -> Result<(), PolicyError> {
        let present = [
            self.xp_per_rupee.is_some(),
            self.max_xp_per_txn.is_some(),
            self.persona_multipliers.is_some(),
            self.daily_cac_limit.is_some(),
            self.feature_flags.is_some(),
            self.policy_version.is_some(),
        ];
        if let Some((key, _)) = REQUIRED_KEYS
            .iter()
            .zip(present)
            .find(|(_, present)| !present)
        {
            return Err(PolicyError::MissingKey(*key));
        }

        if !contains(&self.persona_multipliers, persona) {
            return Err(PolicyError::UnknownPersona {
                map: "persona_multipliers",
                persona,
            });
        }
        if !contains(&self.daily_cac_limit, persona) {
            return Err(PolicyError::UnknownPersona {
                map: "daily_cac_limit",
                persona,
            });
        }

        Ok(())
    }

    /// Resolve the numeric policy for `persona`
    ///
    /// Runs the structural check again cheaply and rejects negative or
    /// non-finite numbers.
    pub fn resolve(&self, persona: Persona) -> Result<PersonaPolicy, PolicyError> {
        let missing = |key| PolicyError::MissingKey(key);

        let xp_per_unit = non_negative(
            "xp_per_rupee",
            self.xp_per_rupee.ok_or(missing("xp_per_rupee"))?,
        )?;
        let max_xp = non_negative(
            "max_xp_per_txn",
            self.max_xp_per_txn.ok_or(missing("max_xp_per_txn"))?,
        )?;
        let multiplier = non_negative(
            &format!("persona_multipliers[{}]", persona),
            lookup(&self.persona_multipliers, "persona_multipliers", persona)?,
        )?;
        let daily_cap = non_negative(
            &format!("daily_cac_limit[{}]", persona),
            lookup(&self.daily_cac_limit, "daily_cac_limit", persona)?.trunc(),
        )?;
        let gold_value = non_negative("gold_reward_value", self.gold_reward_value)?;

        Ok(PersonaPolicy {
            persona,
            xp_per_unit,
            max_xp_per_txn: max_xp as i64,
            multiplier,
            daily_cap: daily_cap as i64,
            gold_value: gold_value as i64,
            flags: self.feature_flags.clone().ok_or(missing("feature_flags"))?,
            policy_version: self
                .policy_version
                .clone()
                .ok_or(missing("policy_version"))?,
            ttls: self.cache.clone(),
        })
    }
}

fn contains(map: &Option<HashMap<String, f64>>, persona: Persona) -> bool {
    map.as_ref()
        .map(|m| m.contains_key(persona.as_str()))
        .unwrap_or(false)
}

fn lookup(
    map: &Option<HashMap<String, f64>>,
    name: &'static str,
    persona: Persona,
) -> Result<f64, PolicyError> {
    map.as_ref()
        .ok_or(PolicyError::MissingKey(name))?
        .get(persona.as_str())
        .copied()
        .ok_or(PolicyError::UnknownPersona { map: name, persona })
}

fn non_negative(field: &str, value: f64) -> Result<f64, PolicyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PolicyError::Negative(field.to_string()))
    }
}
