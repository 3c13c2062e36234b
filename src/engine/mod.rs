//! Reward decision engine
//!
//! - `types`: request, decision record and enums
//! - `clock`: calendar day source for daily cap keys
//! - `decode`: tolerant decoding of cached values
//! - `persona`: operator persona overrides
//! - `pipeline`: the decision itself

pub mod clock;
pub mod decode;
pub mod persona;
pub mod pipeline;
pub mod types;

pub use self::clock::{Clock, SystemClock, TodayCache};
#[cfg(any(test, feature = "test-utils"))]
pub use self::clock::FixedClock;
pub use self::persona::PersonaOverrides;
pub use self::pipeline::{compute_xp, select_reward, RewardChoice, RewardEngine};
pub use self::types::{
    DecisionMeta, DecisionRecord, Persona, ReasonCode, RewardRequest, RewardType,
    TransactionType,
};
