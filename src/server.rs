//! Inbound HTTP surface.
//!
//! One handler serves every method on `/tailscale-authkey` (and `/`). Validation runs in a
//! fixed order and stops at the first failure: method, bearer credential, configuration,
//! then the [`KeyIssuer`] pipeline.

// crates.io
use axum::{
	Json, Router,
	extract::State,
	http::{
		HeaderMap, HeaderValue, Method, StatusCode,
		header::{ALLOW, AUTHORIZATION, CACHE_CONTROL},
	},
	response::{IntoResponse, Response},
	routing::any,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::{BearerCredential, CredentialError},
	config::Config,
	error::ConfigError,
	issuer::KeyIssuer,
	obs,
	provider::IssuedKey,
};

/// Route the endpoint is mounted on, besides `/`.
pub const ROUTE: &str = "/tailscale-authkey";

/// Shared handler state.
///
/// An unconfigured state keeps the listener up but answers every authenticated `POST` with
/// `500 Server not configured`.
#[derive(Clone, Debug, Default)]
pub struct AppState {
	issuer: Option<Arc<KeyIssuer>>,
}
impl AppState {
	/// State backed by a ready issuer.
	pub fn configured(issuer: KeyIssuer) -> Self {
		Self { issuer: Some(Arc::new(issuer)) }
	}

	/// State for a process started without a complete configuration.
	pub fn unconfigured() -> Self {
		Self { issuer: None }
	}

	/// Builds the state from a configuration load result.
	///
	/// A load failure, or a transport that cannot be built, yields an unconfigured state and a
	/// warning naming the offending variable (never its value).
	pub fn from_config(config: Result<Config, ConfigError>) -> Self {
		match config.and_then(KeyIssuer::new) {
			Ok(issuer) => Self::configured(issuer),
			Err(e) => {
				obs::report_issuance_disabled(&e);

				Self::unconfigured()
			},
		}
	}

	/// Returns true when an issuer is available.
	pub fn is_configured(&self) -> bool {
		self.issuer.is_some()
	}
}

/// Builds the router serving the key endpoint.
pub fn router(state: AppState) -> Router {
	Router::new().route("/", any(handle)).route(ROUTE, any(handle)).with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

/// Handles one inbound request.
pub async fn handle(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
	match method {
		Method::OPTIONS => StatusCode::NO_CONTENT.into_response(),
		Method::POST => match issue(&state, &headers).await {
			Ok(key) => issued(key),
			Err(err) => err.into_response(),
		},
		_ => (
			StatusCode::METHOD_NOT_ALLOWED,
			[(ALLOW, HeaderValue::from_static("POST, OPTIONS"))],
			"Method Not Allowed",
		)
			.into_response(),
	}
}

async fn issue(state: &AppState, headers: &HeaderMap) -> Result<IssuedKey> {
	let header = headers
		.get(AUTHORIZATION)
		.map(|value| value.to_str().map_err(|_| CredentialError::NotBearer))
		.transpose()?;
	let credential = BearerCredential::parse(header)?;
	let issuer = state.issuer.as_ref().ok_or(Error::NotConfigured)?;

	issuer.issue(&credential).await
}

fn issued(key: IssuedKey) -> Response {
	(StatusCode::OK, [(CACHE_CONTROL, HeaderValue::from_static("no-store"))], Json(key))
		.into_response()
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status =
			StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		(status, self.public_message()).into_response()
	}
}
