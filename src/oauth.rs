//! OAuth client-credentials grant against the provider token endpoint.
//!
//! The grant is sent over the shared [`UpstreamHttpClient`] seam rather than through an
//! `oauth2` client: any 2xx reply is accepted and only `access_token` is read from it, so
//! providers that omit `token_type` or answer `201` still succeed.

pub use oauth2;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::ProviderConfig,
	error::{TransportError, UpstreamError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient, map_transport_error},
};

const GRANT_BODY: &[u8] = b"grant_type=client_credentials";

/// Exchanges the service's client credentials for a provider access token.
///
/// Client authentication is HTTP Basic over the raw `client_id:client_secret` pair. The
/// access token is returned as a [`Secret`] and never cached.
#[derive(Clone, Debug)]
pub struct ClientCredentialsExchange {
	token_endpoint: Url,
	basic_authorization: Secret,
}
impl ClientCredentialsExchange {
	/// Configures the exchange for the provider token endpoint.
	pub fn new(provider: &ProviderConfig) -> Self {
		let pair = format!("{}:{}", provider.client_id, provider.client_secret.expose());

		Self {
			token_endpoint: provider.token_endpoint.clone(),
			basic_authorization: Secret::new(format!("Basic {}", STANDARD.encode(pair))),
		}
	}

	/// Performs the grant and returns the access token.
	pub async fn access_token<C>(&self, http_client: &C) -> Result<Secret, UpstreamError>
	where
		C: ?Sized + UpstreamHttpClient,
	{
		let request = self
			.request()
			.map_err(|e| token_failure(None, TransportError::from(e).to_string()))?;
		let meta = ResponseMetadataSlot::default();
		let handle = http_client.with_metadata(meta.clone());
		let response = handle
			.call(request)
			.await
			.map_err(|e| token_failure(meta.take(), map_transport_error(e).to_string()))?;
		let meta = ResponseMetadata::from_response(&response);

		if !response.status().is_success() {
			return Err(token_failure(Some(meta), error_reason(response.body())));
		}

		parse_access_token(response.body()).map_err(|reason| token_failure(Some(meta), reason))
	}

	fn request(&self) -> Result<HttpRequest, oauth2::http::Error> {
		Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(AUTHORIZATION, self.basic_authorization.expose())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(GRANT_BODY.to_vec())
	}
}

#[derive(Deserialize)]
struct TokenBody {
	#[serde(default)]
	access_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

fn parse_access_token(body: &[u8]) -> Result<Secret, String> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let token: TokenBody = serde_path_to_error::deserialize(de)
		.map_err(|e| format!("token response is malformed at `{}`", e.path()))?;

	match token.access_token {
		Some(access_token) if !access_token.is_empty() => Ok(Secret::new(access_token)),
		_ => Err("token response carries no access token".into()),
	}
}

fn error_reason(body: &[u8]) -> String {
	match serde_json::from_slice::<ErrorBody>(body) {
		Ok(ErrorBody { error, error_description: Some(description) }) =>
			format!("provider returned `{error}`: {description}"),
		Ok(ErrorBody { error, error_description: None }) => format!("provider returned `{error}`"),
		Err(_) => "provider rejected the grant".into(),
	}
}

fn token_failure(meta: Option<ResponseMetadata>, reason: String) -> UpstreamError {
	let meta = meta.unwrap_or_default();

	UpstreamError::TokenExchange { reason, status: meta.status, retry_after: meta.retry_after }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn exchange(client_id: &str, client_secret: &str) -> ClientCredentialsExchange {
		let config = crate::config::Config::from_lookup(|name| match name {
			"SUPABASE_URL" => Some("https://store.example.com".into()),
			"SUPABASE_ANON_KEY" => Some("anon".into()),
			"TAILSCALE_OAUTH_CLIENT_ID" => Some(client_id.into()),
			"TAILSCALE_OAUTH_CLIENT_SECRET" => Some(client_secret.into()),
			"TAILNET_NAME" => Some("example.com".into()),
			_ => None,
		})
		.expect("Configuration should load.");

		ClientCredentialsExchange::new(&config.provider)
	}

	#[test]
	fn basic_header_encodes_raw_credentials() {
		let exchange = exchange("client", "p@ss:w/rd%");
		let request = exchange.request().expect("Grant request should build.");

		assert_eq!(
			request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some(format!("Basic {}", STANDARD.encode("client:p@ss:w/rd%")).as_str())
		);
		assert_eq!(request.body().as_slice(), GRANT_BODY);
		assert!(!format!("{exchange:?}").contains("p@ss"));
	}

	#[test]
	fn only_access_token_is_required() {
		let token = parse_access_token(br#"{"access_token":"provider-access"}"#)
			.expect("Token without token_type should parse.");

		assert_eq!(token.expose(), "provider-access");

		for body in [&br#"{}"#[..], br#"{"access_token":""}"#, br#"{"access_token":null}"#] {
			assert!(parse_access_token(body).is_err());
		}

		assert!(parse_access_token(b"<html>").is_err());
	}

	#[test]
	fn error_reason_keeps_oauth_code() {
		assert_eq!(
			error_reason(br#"{"error":"invalid_client","error_description":"client is disabled"}"#),
			"provider returned `invalid_client`: client is disabled"
		);
		assert_eq!(error_reason(b"denied"), "provider rejected the grant");
	}

	#[test]
	fn failures_keep_status_and_retry_hint() {
		let err = token_failure(
			Some(ResponseMetadata { status: Some(429), retry_after: Some(Duration::seconds(5)) }),
			"throttled".into(),
		);

		assert_eq!(err.status(), Some(429));
		assert_eq!(err.retry_after(), Some(Duration::seconds(5)));

		let err = token_failure(None, "connection reset".into());

		assert!(matches!(
			err,
			UpstreamError::TokenExchange { status: None, retry_after: None, .. }
		));
	}
}
