//! Issuer-level error types shared across the pipeline stages and the HTTP surface.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error produced while handling a key request.
///
/// Every variant maps onto a fixed public status and message; see [`Error::status`] and
/// [`Error::public_message`]. Detail carried by the variants is for logs only.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The endpoint was started without a complete configuration.
	#[error("Server is not configured.")]
	NotConfigured,
	/// Caller credential is absent or not a bearer credential.
	#[error(transparent)]
	Credential(#[from] crate::auth::CredentialError),
	/// Identity store did not confirm a verified operator.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),
	/// Provider token or key endpoint failed.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
}
impl Error {
	/// HTTP status code surfaced to the caller.
	pub fn status(&self) -> u16 {
		match self {
			Self::NotConfigured => 500,
			Self::Credential(_) => 401,
			Self::Authorization(_) => 403,
			Self::Upstream(_) => 502,
		}
	}

	/// Generic response body surfaced to the caller.
	///
	/// Authorization failures share one message so the response never reveals whether an
	/// operator record exists.
	pub fn public_message(&self) -> &'static str {
		match self {
			Self::NotConfigured => "Server not configured",
			Self::Credential(_) => "Unauthorized",
			Self::Authorization(_) => "Forbidden",
			Self::Upstream(UpstreamError::TokenExchange { .. }) => "OAuth failed",
			Self::Upstream(UpstreamError::KeyCreate { .. }) => "Key create failed",
			Self::Upstream(UpstreamError::KeyMissing) => "Key missing",
		}
	}
}

/// Configuration and validation failures raised while building the issuer.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or empty.
	#[error("Required configuration `{name}` is missing.")]
	Missing {
		/// Variable name.
		name: &'static str,
	},
	/// A URL-valued variable cannot be parsed.
	#[error("Configuration `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Variable name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A URL-valued variable uses a scheme other than HTTP(S).
	#[error("Configuration `{name}` must use http or https, found `{scheme}`.")]
	UnsupportedScheme {
		/// Variable name.
		name: &'static str,
		/// Offending scheme.
		scheme: String,
	},
	/// A socket address variable cannot be parsed.
	#[error("Configuration `{name}` is not a valid socket address.")]
	InvalidAddr {
		/// Variable name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: std::net::AddrParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Reasons the identity store refused to vouch for the caller.
#[derive(Debug, ThisError)]
pub enum AuthorizationError {
	/// The lookup itself failed (transport, non-2xx status, or malformed body).
	#[error("Operator lookup failed.")]
	Lookup {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Underlying failure, when one exists.
		#[source]
		source: Option<BoxError>,
	},
	/// The store returned no operator row for the caller.
	#[error("No operator record is visible to the caller.")]
	NotFound,
	/// The operator row exists but is not verified.
	#[error("Operator is not verified.")]
	NotVerified,
}
impl AuthorizationError {
	/// Wraps a failure that happened before or while reading the lookup response.
	pub fn lookup(status: Option<u16>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Lookup { status, source: Some(Box::new(src)) }
	}
}

/// Failures reported by the device-mesh provider.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Client-credentials grant failed.
	#[error("Token endpoint failed: {reason}.")]
	TokenExchange {
		/// Broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Key-creation endpoint failed.
	#[error("Key endpoint failed.")]
	KeyCreate {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
		/// Underlying failure, when one exists.
		#[source]
		source: Option<BoxError>,
	},
	/// Key endpoint succeeded but returned no key under any known field.
	#[error("Key endpoint response carries no key.")]
	KeyMissing,
}
impl UpstreamError {
	/// HTTP status code reported by the provider, when known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenExchange { status, .. } | Self::KeyCreate { status, .. } => *status,
			Self::KeyMissing => None,
		}
	}

	/// Retry-After hint reported by the provider, when known.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::TokenExchange { retry_after, .. } | Self::KeyCreate { retry_after, .. } =>
				*retry_after,
			Self::KeyMissing => None,
		}
	}
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling an upstream endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling an upstream endpoint.")]
	Io(#[from] std::io::Error),
	/// HTTP request construction failed.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
	/// Transport failed without a typed cause.
	#[error("HTTP client error occurred while calling an upstream endpoint: {0}.")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::CredentialError;

	#[test]
	fn public_mapping_matches_endpoint_contract() {
		let cases = [
			(Error::NotConfigured, 500, "Server not configured"),
			(Error::from(CredentialError::Missing), 401, "Unauthorized"),
			(Error::from(AuthorizationError::NotFound), 403, "Forbidden"),
			(Error::from(AuthorizationError::NotVerified), 403, "Forbidden"),
			(
				Error::from(UpstreamError::TokenExchange {
					reason: "denied".into(),
					status: Some(401),
					retry_after: None,
				}),
				502,
				"OAuth failed",
			),
			(
				Error::from(UpstreamError::KeyCreate {
					status: Some(500),
					retry_after: None,
					source: None,
				}),
				502,
				"Key create failed",
			),
			(Error::from(UpstreamError::KeyMissing), 502, "Key missing"),
		];

		for (err, status, message) in cases {
			assert_eq!(err.status(), status, "unexpected status for {err:?}");
			assert_eq!(err.public_message(), message, "unexpected message for {err:?}");
		}
	}

	#[test]
	fn lookup_failures_are_indistinguishable_from_denials() {
		let lookup = Error::from(AuthorizationError::Lookup { status: Some(406), source: None });
		let denied = Error::from(AuthorizationError::NotVerified);

		assert_eq!(lookup.status(), denied.status());
		assert_eq!(lookup.public_message(), denied.public_message());
	}
}
