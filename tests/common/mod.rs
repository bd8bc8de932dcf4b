//! Shared helpers for integration tests.

#![allow(dead_code)]

// crates.io
use axum::{
	body::{Body, to_bytes},
	http::{HeaderMap, Method, Request, StatusCode, header::AUTHORIZATION},
};
use tower::util::ServiceExt;
// self
use tailnet_authkey::{
	config::Config,
	error::ConfigError,
	http::ReqwestHttpClient,
	issuer::KeyIssuer,
	reqwest::Client,
	server::{self, AppState},
};

pub const CLIENT_ID: &str = "client-operator";
pub const CLIENT_SECRET: &str = "secret-operator";
pub const ANON_KEY: &str = "anon-public-key";
pub const TAILNET: &str = "example.com";
pub const CALLER: &str = "Bearer caller-session-jwt";
pub const OPERATORS_PATH: &str = "/rest/v1/operators";
pub const TOKEN_PATH: &str = "/api/v2/oauth/token";
pub const KEYS_PATH: &str = "/api/v2/tailnet/example.com/keys";

/// Environment pairs for a complete configuration.
pub fn env(store_url: &str, provider_url: &str) -> Vec<(&'static str, String)> {
	vec![
		("SUPABASE_URL", store_url.to_owned()),
		("SUPABASE_ANON_KEY", ANON_KEY.to_owned()),
		("TAILSCALE_OAUTH_CLIENT_ID", CLIENT_ID.to_owned()),
		("TAILSCALE_OAUTH_CLIENT_SECRET", CLIENT_SECRET.to_owned()),
		("TAILNET_NAME", TAILNET.to_owned()),
		("TAILSCALE_API_URL", provider_url.to_owned()),
	]
}

/// Loads a configuration from explicit pairs instead of the process environment.
pub fn load(vars: &[(&'static str, String)]) -> Result<Config, ConfigError> {
	Config::from_lookup(|name| {
		vars.iter().find(|(key, _)| *key == name).map(|(_, value)| value.clone())
	})
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn insecure_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Configured state pointing the store and provider at the given base URLs.
pub fn configured_state(store_url: &str, provider_url: &str) -> AppState {
	let config = load(&env(store_url, provider_url)).expect("Test configuration should load.");

	AppState::configured(KeyIssuer::with_http_client(config, insecure_http_client()))
}

/// Builds a request against the key route.
pub fn request(method: Method, authorization: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder().method(method).uri(server::ROUTE);

	if let Some(value) = authorization {
		builder = builder.header(AUTHORIZATION, value);
	}

	builder.body(Body::empty()).expect("Request should build.")
}

/// Runs a request through the router and collects status, headers, and body.
pub async fn call(state: AppState, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
	let response = server::router(state)
		.oneshot(request)
		.await
		.expect("Router should always produce a response.");
	let status = response.status();
	let headers = response.headers().clone();
	let body = to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	(status, headers, String::from_utf8_lossy(&body).into_owned())
}
