//! Signing, validation and the time sources they depend on.

pub mod clock;
pub mod signed_request;
pub mod window;

pub use clock::*;
pub use signed_request::*;
pub use window::*;
