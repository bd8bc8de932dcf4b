//! Authenticated call to the per-tailnet key-creation endpoint.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::ProviderConfig,
	error::{TransportError, UpstreamError},
	http::{self, ResponseMetadata, UpstreamHttpClient},
	provider::{IssuedKey, KeyPolicy, parse_key_response},
};

/// Issues pre-authorization keys for one tailnet.
#[derive(Clone, Debug)]
pub struct KeyFactory {
	/// Key-creation endpoint.
	pub endpoint: Url,
	/// Capabilities requested for every key.
	pub policy: KeyPolicy,
}
impl KeyFactory {
	/// Creates a factory for the configured tailnet.
	pub fn new(provider: &ProviderConfig, policy: KeyPolicy) -> Self {
		Self { endpoint: provider.keys_endpoint.clone(), policy }
	}

	/// Requests a new key using a provider access token.
	///
	/// Transport failures and non-2xx statuses surface as [`UpstreamError::KeyCreate`]; a
	/// successful reply without a key surfaces as [`UpstreamError::KeyMissing`].
	pub async fn create<C>(
		&self,
		http_client: &C,
		access_token: &Secret,
	) -> Result<IssuedKey, UpstreamError>
	where
		C: ?Sized + UpstreamHttpClient,
	{
		let body = serde_json::to_vec(&self.policy.request()).map_err(key_create_failure)?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(|e| key_create_failure(TransportError::from(e)))?;
		let response = http::send(http_client, request).await.map_err(key_create_failure)?;

		if !response.status().is_success() {
			let meta = ResponseMetadata::from_response(&response);

			return Err(UpstreamError::KeyCreate {
				status: meta.status,
				retry_after: meta.retry_after,
				source: None,
			});
		}

		parse_key_response(response.body()).map_err(|err| match err {
			UpstreamError::KeyCreate { source, .. } => UpstreamError::KeyCreate {
				status: Some(response.status().as_u16()),
				retry_after: None,
				source,
			},
			other => other,
		})
	}
}

fn key_create_failure(src: impl 'static + Send + Sync + StdError) -> UpstreamError {
	UpstreamError::KeyCreate { status: None, retry_after: None, source: Some(Box::new(src)) }
}
