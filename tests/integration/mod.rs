//! Integration tests for the reward decision service
//!
//! These tests drive the complete router (middleware, handlers, engine and
//! in-memory cache) through `axum-test`.

mod health;
mod idempotency;
mod persona;
mod reward_decide;
