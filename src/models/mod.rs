//! Data models for signed requests.
//!
//! This module contains the temporal value types (timestamps and intervals),
//! the signed payload field set and the audit event types.

pub mod audit;
pub mod interval;
pub mod payload;
pub mod timestamp;

pub use audit::*;
pub use interval::*;
pub use payload::*;
pub use timestamp::*;
