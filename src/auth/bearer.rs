//! Bearer credential parsing for inbound `Authorization` headers.

// self
use crate::{_prelude::*, auth::Secret};

const BEARER_PREFIX: &str = "Bearer ";

/// Errors raised when the caller's `Authorization` header is unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// No `Authorization` header was supplied.
	#[error("Authorization header is missing.")]
	Missing,
	/// The header is not a `Bearer <token>` credential.
	#[error("Authorization header is not a bearer credential.")]
	NotBearer,
}

/// Caller credential forwarded verbatim to the identity store.
///
/// The whole header value is retained so the store sees exactly what the caller sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerCredential(Secret);
impl BearerCredential {
	/// Parses an `Authorization` header value.
	///
	/// The scheme match is case-sensitive and requires a single space, and an empty token
	/// is rejected.
	pub fn parse(header: Option<&str>) -> Result<Self, CredentialError> {
		let header = header.ok_or(CredentialError::Missing)?;
		let token = header.strip_prefix(BEARER_PREFIX).ok_or(CredentialError::NotBearer)?;

		if token.trim().is_empty() {
			return Err(CredentialError::NotBearer);
		}

		Ok(Self(Secret::new(header)))
	}

	/// Full header value, suitable for forwarding as `Authorization`.
	pub fn header_value(&self) -> &str {
		self.0.expose()
	}
}
