//! Middleware module
//!
//! Request correlation and timing layers applied to every route.

pub mod request_id;
pub mod timing;

pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use timing::{timing_middleware, PROCESS_TIME_HEADER};
