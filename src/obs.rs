//! Optional observability helpers for the issuance pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default through `bin`) to emit structured spans named
//!   `tailnet_authkey.stage` with the `stage` field, warn-level events for failed stages
//!   carrying the upstream status and Retry-After hint, and [`init_tracing`] for binaries.
//! - Enable `metrics` to increment the `tailnet_authkey_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages that talk to an upstream service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Operator lookup in the identity store.
	Authorize,
	/// Client-credentials grant at the provider.
	TokenExchange,
	/// Pre-authorization key creation at the provider.
	KeyCreate,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Authorize => "authorize",
			Stage::TokenExchange => "token_exchange",
			Stage::KeyCreate => "key_create",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
