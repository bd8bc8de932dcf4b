//! Mint single-use Tailscale pre-authorization keys for verified operators.
//!
//! A caller presents the bearer credential issued by the identity store. The crate forwards
//! that credential to the store so its row-level security decides whether the caller owns a
//! verified operator record, exchanges the service's OAuth client credentials for a provider
//! access token, and asks the provider for a short-lived, single-use, pre-authorized key.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod issuer;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(feature = "bin")] use color_eyre as _;
#[cfg(test)] use httpmock as _;
