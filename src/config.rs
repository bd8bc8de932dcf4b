//! Process configuration assembled once at startup.
//!
//! [`Config`] carries everything the issuer needs and is validated as a single precondition:
//! either every required variable is present and well formed, or construction fails with the
//! first offending variable name. [`ServerConfig`] is kept separate so the listener can still
//! start (and answer `500`) when the issuer configuration is incomplete.

// std
use std::net::SocketAddr;
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, provider::KeyPolicy};

/// Identity store base URL.
pub const ENV_STORE_URL: &str = "SUPABASE_URL";
/// Identity store public (anon) API key.
pub const ENV_STORE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
/// Provider OAuth client identifier.
pub const ENV_CLIENT_ID: &str = "TAILSCALE_OAUTH_CLIENT_ID";
/// Provider OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "TAILSCALE_OAUTH_CLIENT_SECRET";
/// Target tailnet name.
pub const ENV_TAILNET: &str = "TAILNET_NAME";
/// Optional provider API base URL override.
pub const ENV_API_URL: &str = "TAILSCALE_API_URL";
/// Optional listener address.
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";

/// Provider API base used when [`ENV_API_URL`] is unset.
pub const DEFAULT_API_URL: &str = "https://api.tailscale.com";
/// Listener address used when [`ENV_LISTEN_ADDR`] is unset.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

const OPERATORS_TABLE: &str = "operators";

/// Row-secured identity store settings.
#[derive(Clone, Debug)]
pub struct IdentityStoreConfig {
	/// Public API key sent as `apikey`; row-level security still applies.
	pub anon_key: Secret,
	/// Fully resolved operator lookup URL (`/rest/v1/operators?select=verified`).
	pub operators_endpoint: Url,
}

/// Device-mesh provider settings.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Tailnet the issued keys join.
	pub tailnet: String,
	/// OAuth token endpoint.
	pub token_endpoint: Url,
	/// Per-tailnet key-creation endpoint, tailnet percent-encoded as one path segment.
	pub keys_endpoint: Url,
}

/// Validated issuer configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Identity store settings.
	pub identity: IdentityStoreConfig,
	/// Provider settings.
	pub provider: ProviderConfig,
	/// Capabilities requested for every issued key.
	pub key_policy: KeyPolicy,
}
impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through an arbitrary variable lookup.
	///
	/// Empty or whitespace-only values count as missing.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let store_url = required(&lookup, ENV_STORE_URL)?;
		let anon_key = required(&lookup, ENV_STORE_ANON_KEY)?;
		let client_id = required(&lookup, ENV_CLIENT_ID)?;
		let client_secret = required(&lookup, ENV_CLIENT_SECRET)?;
		let tailnet = required(&lookup, ENV_TAILNET)?;
		let api_url = optional(&lookup, ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.into());
		let store_url = parse_url(ENV_STORE_URL, &store_url)?;
		let api_url = parse_url(ENV_API_URL, &api_url)?;
		let identity = IdentityStoreConfig {
			operators_endpoint: operators_endpoint(&store_url),
			anon_key: Secret::new(anon_key),
		};
		let provider = ProviderConfig {
			token_endpoint: endpoint(&api_url, &["api", "v2", "oauth", "token"]),
			keys_endpoint: endpoint(&api_url, &["api", "v2", "tailnet", &tailnet, "keys"]),
			client_id,
			client_secret: Secret::new(client_secret),
			tailnet,
		};

		Ok(Self { identity, provider, key_policy: KeyPolicy::default() })
	}
}

/// Listener settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
	/// Socket address the HTTP listener binds.
	pub listen_addr: SocketAddr,
}
impl ServerConfig {
	/// Reads the listener settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the listener settings through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw =
			optional(&lookup, ENV_LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
		let listen_addr = raw
			.parse()
			.map_err(|source| ConfigError::InvalidAddr { name: ENV_LISTEN_ADDR, source })?;

		Ok(Self { listen_addr })
	}
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(name).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	optional(lookup, name).ok_or(ConfigError::Missing { name })
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		scheme => Err(ConfigError::UnsupportedScheme { name, scheme: scheme.to_owned() }),
	}
}

fn operators_endpoint(store_url: &Url) -> Url {
	let mut url = endpoint(store_url, &["rest", "v1", OPERATORS_TABLE]);

	url.query_pairs_mut().append_pair("select", "verified");

	url
}

// HTTP(S) URLs always have a path, so `path_segments_mut` cannot fail here.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
	let mut url = base.clone();

	if let Ok(mut path) = url.path_segments_mut() {
		path.pop_if_empty().extend(segments);
	}

	url
}
