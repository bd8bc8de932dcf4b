//! Row-secured operator lookup.
//!
//! The lookup runs as the caller: the caller's own `Authorization` header is forwarded so
//! the store's row-level security decides which operator rows are visible. The request asks
//! for single-object semantics, so the store itself rejects zero or multiple visible rows.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::{BearerCredential, Secret},
	config::IdentityStoreConfig,
	error::{AuthorizationError, TransportError},
	http::{self, UpstreamHttpClient},
};

/// Media type requesting exactly one row as a JSON object.
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Operator row as seen through row-level security.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OperatorRecord {
	/// Whether the operator has been verified; `null` counts as unverified.
	#[serde(default)]
	pub verified: Option<bool>,
}
impl OperatorRecord {
	/// Returns true only for an explicit `verified: true`.
	pub fn is_verified(&self) -> bool {
		self.verified.unwrap_or(false)
	}
}

/// Client for the operators table.
#[derive(Clone, Debug)]
pub struct OperatorDirectory {
	/// Lookup URL selecting the `verified` column.
	pub endpoint: Url,
	/// Public API key identifying the project.
	pub anon_key: Secret,
}
impl OperatorDirectory {
	/// Creates a directory client from the store configuration.
	pub fn new(config: &IdentityStoreConfig) -> Self {
		Self { endpoint: config.operators_endpoint.clone(), anon_key: config.anon_key.clone() }
	}

	/// Fetches the caller's operator row.
	pub async fn fetch<C>(
		&self,
		http_client: &C,
		credential: &BearerCredential,
	) -> Result<Option<OperatorRecord>, AuthorizationError>
	where
		C: ?Sized + UpstreamHttpClient,
	{
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.endpoint.as_str())
			.header("apikey", self.anon_key.expose())
			.header(AUTHORIZATION, credential.header_value())
			.header(ACCEPT, SINGLE_OBJECT)
			.body(Vec::new())
			.map_err(|e| AuthorizationError::lookup(None, TransportError::from(e)))?;
		let response = http::send(http_client, request)
			.await
			.map_err(|e| AuthorizationError::lookup(None, e))?;
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(AuthorizationError::Lookup { status: Some(status), source: None });
		}

		let de = &mut serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(de)
			.map_err(|e| AuthorizationError::lookup(Some(status), e))
	}

	/// Confirms the caller owns a verified operator row.
	pub async fn verify<C>(
		&self,
		http_client: &C,
		credential: &BearerCredential,
	) -> Result<(), AuthorizationError>
	where
		C: ?Sized + UpstreamHttpClient,
	{
		match self.fetch(http_client, credential).await? {
			None => Err(AuthorizationError::NotFound),
			Some(record) if !record.is_verified() => Err(AuthorizationError::NotVerified),
			Some(_) => Ok(()),
		}
	}
}
