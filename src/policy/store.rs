//! Live policy holder
//!
//! Holds the current policy and a per-persona memo of structural
//! validation results. Swapping the policy clears the memo in the same
//! critical section, so a memo entry always belongs to the policy it sits
//! next to.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::{PersonaPolicy, PolicyConfig, PolicyError};
use crate::engine::types::Persona;

struct PolicyState {
    current: Arc<PolicyConfig>,
    validated: HashMap<Persona, Result<(), PolicyError>>,
}

/// Current policy plus its validation memo
pub struct PolicyStore {
    state: RwLock<PolicyState>,
    source: Option<PathBuf>,
}

impl PolicyStore {
    /// Wrap an in-memory policy
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            state: RwLock::new(PolicyState {
                current: Arc::new(policy),
                validated: HashMap::new(),
            }),
            source: None,
        }
    }

    /// Load from `path`, falling back to the built-in policy
    ///
    /// A missing or unreadable file is not fatal at startup; the built-in
    /// defaults apply and a warning is logged.
    pub fn load(path: Option<PathBuf>) -> Self {
        let policy = match &path {
            Some(path) => match PolicyConfig::from_file(path) {
                Ok(policy) => {
                    info!(
                        path = %path.display(),
                        version = ?policy.policy_version,
                        "Policy loaded"
                    );
                    policy
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load policy file, using built-in defaults");
                    PolicyConfig::default()
                }
            },
            None => {
                info!("No policy file configured, using built-in defaults");
                PolicyConfig::default()
            }
        };

        Self {
            source: path,
            ..Self::new(policy)
        }
    }

    /// Snapshot of the current policy
    pub fn current(&self) -> Arc<PolicyConfig> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Swap in a new policy and forget all validation results
    pub fn replace(&self, policy: PolicyConfig) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.current = Arc::new(policy);
        state.validated.clear();
        debug!("Policy replaced, validation cache cleared");
    }

    /// Re-read the policy file
    ///
    /// On failure the current policy stays in place.
    pub fn reload(&self) -> Result<Arc<PolicyConfig>, PolicyError> {
        let path = self
            .source
            .as_ref()
            .ok_or_else(|| PolicyError::Load("no policy file configured".to_string()))?;

        let policy = PolicyConfig::from_file(path)?;
        info!(
            path = %path.display(),
            version = ?policy.policy_version,
            "Policy reloaded"
        );
        self.replace(policy);
        Ok(self.current())
    }

    /// Validate (memoized) and resolve the current policy for `persona`
    pub fn resolve(&self, persona: Persona) -> Result<PersonaPolicy, PolicyError> {
        let (policy, memo) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.current.clone(), state.validated.get(&persona).cloned())
        };

        let verdict = match memo {
            Some(verdict) => verdict,
            None => {
                let verdict = policy.validate_for(persona);
                if let Err(e) = &verdict {
                    warn!(persona = %persona, error = %e, "Policy rejected for persona");
                }
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if Arc::ptr_eq(&state.current, &policy) {
                    state.validated.insert(persona, verdict.clone());
                }
                verdict
            }
        };

        verdict?;
        policy.resolve(persona)
    }

    /// Number of memoized validation results
    pub fn validated_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .validated
            .len()
    }
}
