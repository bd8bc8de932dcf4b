//! Key-creation request descriptor and response parsing.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, auth::Secret, error::UpstreamError};

/// Tag attached to every key issued for an operator.
pub const OPERATOR_TAG: &str = "tag:operator";
/// Lifetime of an issued key, in seconds.
pub const KEY_EXPIRY_SECONDS: u64 = 300;

/// Capabilities requested for each issued key.
///
/// The default is a single-use, non-ephemeral, pre-authorized key tagged
/// [`OPERATOR_TAG`] that expires after [`KEY_EXPIRY_SECONDS`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
	/// Whether the key may join more than one device.
	pub reusable: bool,
	/// Whether devices joined with the key are removed once they go offline.
	pub ephemeral: bool,
	/// Whether devices skip manual admin approval.
	pub preauthorized: bool,
	/// ACL tags applied to joined devices.
	pub tags: Vec<String>,
	/// Key lifetime in seconds.
	pub expiry_seconds: u64,
}
impl KeyPolicy {
	/// Renders the request body sent to the key-creation endpoint.
	pub fn request(&self) -> KeyRequest<'_> {
		KeyRequest {
			capabilities: KeyCapabilities {
				devices: DeviceCapabilities {
					create: DeviceCreate {
						reusable: self.reusable,
						ephemeral: self.ephemeral,
						preauthorized: self.preauthorized,
						tags: &self.tags,
					},
				},
			},
			expiry_seconds: self.expiry_seconds,
		}
	}
}
impl Default for KeyPolicy {
	fn default() -> Self {
		Self {
			reusable: false,
			ephemeral: false,
			preauthorized: true,
			tags: vec![OPERATOR_TAG.into()],
			expiry_seconds: KEY_EXPIRY_SECONDS,
		}
	}
}

/// Wire body for the key-creation endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRequest<'a> {
	/// Capability tree.
	pub capabilities: KeyCapabilities<'a>,
	/// Key lifetime in seconds.
	pub expiry_seconds: u64,
}

/// `capabilities` object of a [`KeyRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct KeyCapabilities<'a> {
	/// Device capabilities.
	pub devices: DeviceCapabilities<'a>,
}

/// `capabilities.devices` object of a [`KeyRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct DeviceCapabilities<'a> {
	/// Device creation flags.
	pub create: DeviceCreate<'a>,
}

/// `capabilities.devices.create` object of a [`KeyRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct DeviceCreate<'a> {
	/// Whether the key may join more than one device.
	pub reusable: bool,
	/// Whether joined devices are ephemeral.
	pub ephemeral: bool,
	/// Whether joined devices skip approval.
	pub preauthorized: bool,
	/// ACL tags applied to joined devices.
	pub tags: &'a [String],
}

/// Key returned to the caller.
///
/// Serializes to exactly `{"auth_key": .., "expires_at": ..}`; `expires_at` is passed
/// through untouched (string, number, or `null`) because the provider has used both
/// timestamp strings and numeric forms.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssuedKey {
	/// The pre-authorization key.
	pub auth_key: Secret,
	/// Expiry as reported by the provider, if any.
	pub expires_at: Option<Value>,
}

// The provider has returned the key and its expiry under two names across API versions.
#[derive(Debug, Default, Deserialize)]
struct KeyResponse {
	#[serde(default)]
	key: Option<Value>,
	#[serde(default, rename = "authKey")]
	auth_key: Option<Value>,
	#[serde(default)]
	expires: Option<Value>,
	#[serde(default)]
	expiry: Option<Value>,
}
impl KeyResponse {
	fn into_issued(self) -> Result<IssuedKey, UpstreamError> {
		let auth_key = [self.key, self.auth_key]
			.into_iter()
			.flatten()
			.find_map(|value| match value {
				Value::String(key) if !key.is_empty() => Some(key),
				_ => None,
			})
			.ok_or(UpstreamError::KeyMissing)?;
		let expires_at = [self.expires, self.expiry].into_iter().flatten().find(is_present);

		Ok(IssuedKey { auth_key: Secret::new(auth_key), expires_at })
	}
}

/// Parses a successful key-creation response body.
///
/// The key is read from `key`, falling back to `authKey`; the expiry from `expires`,
/// falling back to `expiry`. Null, empty, `false`, and zero values count as absent.
pub fn parse_key_response(body: &[u8]) -> Result<IssuedKey, UpstreamError> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let response: KeyResponse = serde_path_to_error::deserialize(de).map_err(|source| {
		UpstreamError::KeyCreate { status: None, retry_after: None, source: Some(Box::new(source)) }
	})?;

	response.into_issued()
}

fn is_present(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
		Value::String(text) => !text.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}
