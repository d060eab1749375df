//! Utility functions and helper modules.
//!
//! HMAC primitives, RFC 3986 query encoding and time unit conversions.

pub mod hmac;
pub mod query;
pub mod time;

pub use query::{build_query, encode_component, parse_query};
pub use time::*;
