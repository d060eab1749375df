//! Signed Request - verification of requests launched from a host platform
//!
//! A host platform opens a third-party application by posting a parameter
//! mapping signed with the application's shared secret. This crate provides:
//! - Canonical RFC 3986 encoding and HMAC-SHA256 signing of parameter mappings
//! - Validation of signed payloads with constant-time signature comparison
//! - Freshness checks against a configurable window with an injectable clock
//! - Microsecond-precision timestamps and calendar intervals
//!
//! ## Architecture
//!
//! - `models/` - Timestamps, intervals, payload fields and audit events
//! - `services/` - The signer/validator, the signature window and clocks
//! - `utils/` - HMAC, query string and time unit helpers
//! - `config/` - Configuration structures and environment loading
//!
//! ## Quick Start
//!
//! ```
//! use signed_request::SignedRequest;
//!
//! let signer = SignedRequest::new("16763705810009f4", "s3cr3t");
//! let query = signer.sign_to_query_string([
//!     ("appData", ""),
//!     ("issuedAt", "2020-01-01T00:00:00.000+0000"),
//!     ("locale", "en"),
//!     ("networkEID", "N1"),
//!     ("userEID", "U1"),
//!     ("role", "member"),
//! ]);
//! assert!(query.contains("&signature="));
//! ```

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{ConfigError, SignedRequestConfig};
pub use models::{
    Interval, IntervalError, Params, Precision, SignedPayload, TemporalError, Timestamp,
    ValidationAuditEvent, ValidationEventType, ValidationOutcome, REQUIRED_FIELDS,
};
pub use services::{
    canonical_query, Clock, FixedClock, SignatureWindow, SignedRequest, SignedRequestError,
    SystemClock, DEFAULT_WINDOW_SECONDS,
};
