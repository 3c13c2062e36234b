//! Reward decision pipeline
//!
//! One decision reads four cache keys concurrently, replays a stored
//! decision when one exists, and otherwise advances the user's persona,
//! evaluates the policy and returns the new decision. Cache writes for the
//! new state are spawned and never awaited by the caller.
//!
//! There is no mutual exclusion on the idempotency key. Two concurrent
//! requests for the same transaction that both miss the stored decision
//! will both compute and both write; the later write wins and cap usage
//! may be counted twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures::future::join_all;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock, TodayCache};
use super::decode::{decode_cap_usage, decode_count, decode_decision, decode_persona, is_present};
use super::persona::PersonaOverrides;
use super::types::{DecisionMeta, DecisionRecord, ReasonCode, RewardRequest, RewardType};
use crate::cache::{keys, CacheBackend};
use crate::error::AppResult;
use crate::policy::{PersonaPolicy, PolicyStore};
use crate::routes::metrics::{
    record_decision, record_deferred_write_failure, record_idempotent_replay,
};

/// Experience points for `amount` under `policy`
///
/// `floor(amount * rate * multiplier)`, clamped to `[0, max_xp_per_txn]`.
pub fn compute_xp(amount: f64, policy: &PersonaPolicy) -> i64 {
    let raw = (amount * policy.xp_per_unit * policy.multiplier).floor();
    if !raw.is_finite() {
        return 0;
    }
    (raw as i64).min(policy.max_xp_per_txn).max(0)
}

/// Chosen reward for one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardChoice {
    pub reward_type: RewardType,
    pub value: i64,
    pub reason: ReasonCode,
}

/// Pick the reward, first matching rule wins:
///
/// 1. cap reached: XP, `DAILY_CAC_EXCEEDED`
/// 2. `prefer_gold` and POWER persona: flat gold value
/// 3. `prefer_xp`: XP
/// 4. otherwise cashback, bounded by the remaining cap and the XP value
pub fn select_reward(policy: &PersonaPolicy, xp: i64, cap_used: i64) -> RewardChoice {
    if cap_used >= policy.daily_cap {
        return RewardChoice {
            reward_type: RewardType::Xp,
            value: xp,
            reason: ReasonCode::DailyCacExceeded,
        };
    }

    if policy.flags.prefer_gold && policy.persona == super::types::Persona::Power {
        return RewardChoice {
            reward_type: RewardType::Gold,
            value: policy.gold_value,
            reason: ReasonCode::GoldGranted,
        };
    }

    if policy.flags.prefer_xp {
        return RewardChoice {
            reward_type: RewardType::Xp,
            value: xp,
            reason: ReasonCode::XpApplied,
        };
    }

    let headroom = (policy.daily_cap - cap_used).max(0);
    RewardChoice {
        reward_type: RewardType::Checkout,
        value: headroom.min(xp),
        reason: ReasonCode::CashbackGranted,
    }
}

/// A cache write deferred past the response
#[derive(Debug)]
struct PendingWrite {
    key: String,
    value: Value,
    ttl: Duration,
}

/// Decides rewards for transactions
pub struct RewardEngine {
    cache: Arc<dyn CacheBackend>,
    policy: Arc<PolicyStore>,
    overrides: Arc<PersonaOverrides>,
    today: TodayCache,
}

impl RewardEngine {
    /// Create an engine on the local wall clock
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        policy: Arc<PolicyStore>,
        overrides: Arc<PersonaOverrides>,
    ) -> Self {
        Self::with_clock(cache, policy, overrides, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit date source
    pub fn with_clock(
        cache: Arc<dyn CacheBackend>,
        policy: Arc<PolicyStore>,
        overrides: Arc<PersonaOverrides>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            policy,
            overrides,
            today: TodayCache::new(clock),
        }
    }


    /// Decide the reward for a validated request
    ///
    /// State updates are written in the background after this returns.
    pub async fn decide(&self, request: &RewardRequest) -> AppResult<DecisionRecord> {
        let (record, _writes) = self.decide_detached(request).await?;
        Ok(record)
    }

    /// Like [`decide`](Self::decide), also returning the handle of the
    /// background writes (`None` when a stored decision was replayed)
    #[instrument(
        skip(self, request),
        fields(txn_id = %request.txn_id, user_id = %request.user_id)
    )]
    pub async fn decide_detached(
        &self,
        request: &RewardRequest,
    ) -> AppResult<(DecisionRecord, Option<JoinHandle<()>>)> {
        let started = Instant::now();
        let today = self.today.today_string();

        let idem_key = keys::idempotency(&request.txn_id, &request.user_id, &request.merchant_id);
        let persona_key = keys::persona(&request.user_id);
        let count_key = keys::txn_count(&request.user_id);
        let cac_key = keys::daily_cac(&request.user_id, &today);

        let (stored, persona_raw, count_raw, cac_raw) = tokio::join!(
            self.cache.get(&idem_key),
            self.cache.get(&persona_key),
            self.cache.get(&count_key),
            self.cache.get(&cac_key),
        );

        if let Some(stored) = stored.filter(is_present) {
            let record = decode_decision(stored)?;
            debug!(decision_id = %record.decision_id, "Replaying stored decision");
            record_idempotent_replay();
            return Ok((record, None));
        }

        let starting = self
            .overrides
            .get(&request.user_id)
            .unwrap_or_else(|| decode_persona(persona_raw.as_ref()));
        let txn_count = decode_count(count_raw.as_ref()).saturating_add(1);
        let persona = starting.promote(txn_count);
        if persona != starting {
            debug!(from = %starting, to = %persona, txn_count, "Persona promoted");
        }
        let cap_used = decode_cap_usage(cac_raw.as_ref());

        let policy = self.policy.resolve(persona)?;
        let xp = compute_xp(request.amount, &policy);
        let choice = select_reward(&policy, xp, cap_used);

        let record = DecisionRecord {
            decision_id: Uuid::new_v4().to_string(),
            policy_version: policy.policy_version.clone(),
            reward_type: choice.reward_type,
            reward_value: choice.value,
            xp,
            reason_codes: vec![choice.reason],
            meta: DecisionMeta {
                persona,
                daily_cac_used: cap_used,
                daily_cac_limit: policy.daily_cap,
            },
        };

        let stored_record =
            serde_json::to_value(&record).context("failed to encode decision record")?;

        let writes = vec![
            PendingWrite {
                key: persona_key,
                value: json!(persona.as_str()),
                ttl: policy.persona_ttl(),
            },
            PendingWrite {
                key: count_key,
                value: json!(txn_count),
                ttl: policy.persona_ttl(),
            },
            PendingWrite {
                key: cac_key,
                value: json!(cap_used.saturating_add(choice.value)),
                ttl: policy.cac_ttl(),
            },
            PendingWrite {
                key: idem_key,
                value: stored_record,
                ttl: policy.idempotency_ttl(),
            },
        ];
        let handle = self.schedule_writes(writes);

        debug!(
            decision_id = %record.decision_id,
            persona = %persona,
            reward_type = ?record.reward_type,
            reward_value = record.reward_value,
            xp,
            cap_used,
            "Reward decided"
        );
        record_decision(record.reward_type, started.elapsed().as_secs_f64());

        Ok((record, Some(handle)))
    }

    /// Spawn one task per write so a failing write cannot affect the others
    fn schedule_writes(&self, writes: Vec<PendingWrite>) -> JoinHandle<()> {
        let tasks: Vec<JoinHandle<()>> = writes
            .into_iter()
            .map(|write| {
                let cache = self.cache.clone();
                tokio::spawn(async move {
                    if !cache.set(&write.key, write.value, Some(write.ttl)).await {
                        warn!(key = %write.key, "Deferred cache write failed");
                        record_deferred_write_failure();
                    }
                })
            })
            .collect();

        tokio::spawn(async move {
            for result in join_all(tasks).await {
                if let Err(e) = result {
                    warn!(error = %e, "Deferred cache write task aborted");
                    record_deferred_write_failure();
                }
            }
        })
    }
}
