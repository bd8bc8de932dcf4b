//! Caller credentials and redacted secret handling.

pub mod bearer;
pub mod secret;

pub use bearer::*;
pub use secret::*;
