//! Test infrastructure for external services
//!
//! Provides helpers for the Redis cache backend. Redis-backed tests run
//! against a real server and skip themselves when none is reachable.


pub use self::redis::*;
