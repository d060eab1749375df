//! Configuration structures and environment loading.

pub mod signed_request;

pub use signed_request::*;
