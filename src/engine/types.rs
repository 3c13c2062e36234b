//! Request, decision and enum types for reward decisions

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Largest accepted transaction amount
pub const MAX_AMOUNT: f64 = 1_000_000.0;

/// Behavioral tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Persona {
    New,
    Returning,
    Power,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::New, Persona::Returning, Persona::Power];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::New => "NEW",
            Persona::Returning => "RETURNING",
            Persona::Power => "POWER",
        }
    }

    /// Parse the stored representation; anything else is `None`
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    /// Tier after a user's `count`-th decision
    ///
    /// Moves at most one step forward and never backwards.
    pub fn promote(self, count: i64) -> Self {
        match self {
            Persona::New if count >= 3 => Persona::Returning,
            Persona::Returning if count >= 10 => Persona::Power,
            other => other,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of transaction being rewarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Payment,
    Refund,
    Reversal,
    Adjustment,
}

/// Kind of reward granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RewardType {
    /// Experience points
    Xp,
    /// Cashback-style credit bounded by the remaining daily cap
    Checkout,
    /// Flat bonus credit
    Gold,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Xp => "XP",
            RewardType::Checkout => "CHECKOUT",
            RewardType::Gold => "GOLD",
        }
    }
}

/// Why a reward was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    XpApplied,
    CashbackGranted,
    GoldGranted,
    DailyCacExceeded,
}

/// Incoming reward request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardRequest {
    pub txn_id: String,
    pub user_id: String,
    pub merchant_id: String,
    /// Transaction amount, in (0, 1000000]
    pub amount: f64,
    pub txn_type: TransactionType,
    /// Transaction timestamp as supplied by the caller
    pub ts: String,
}

impl RewardRequest {
    /// Check request constraints and trim identifier fields
    pub fn validate(mut self) -> Result<Self, AppError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(AppError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }
        if self.amount > MAX_AMOUNT {
            return Err(AppError::Validation(
                "amount exceeds maximum allowed value".to_string(),
            ));
        }

        for (name, field) in [
            ("txn_id", &mut self.txn_id),
            ("user_id", &mut self.user_id),
            ("merchant_id", &mut self.merchant_id),
        ] {
            let trimmed = field.trim().to_string();
            if trimmed.is_empty() {
                return Err(AppError::Validation(format!("{} cannot be empty", name)));
            }
            *field = trimmed;
        }

        Ok(self)
    }
}

/// Context recorded alongside a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DecisionMeta {
    /// Persona the decision was computed for
    pub persona: Persona,
    /// Credited value already granted today, before this decision
    pub daily_cac_used: i64,
    /// Daily cap for the persona
    pub daily_cac_limit: i64,
}

/// Complete, cacheable result of one reward decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub policy_version: String,
    pub reward_type: RewardType,
    pub reward_value: i64,
    pub xp: i64,
    pub reason_codes: Vec<ReasonCode>,
    pub meta: DecisionMeta,
}
