//! Device-mesh provider key issuance.
//!
//! `key` holds the data exchanged with the key-creation endpoint: the capability
//! descriptor sent upstream ([`KeyPolicy`], [`KeyRequest`]) and the tolerant parse of the
//! reply into an [`IssuedKey`]. `factory` performs the authenticated call itself.

pub mod factory;
pub mod key;

pub use factory::*;
pub use key::*;
