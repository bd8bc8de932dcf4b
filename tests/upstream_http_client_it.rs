mod common;

// std
use std::{collections::HashMap, error::Error as StdError, fmt, future::Future, pin::Pin, sync::Arc};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use tailnet_authkey::{
	auth::BearerCredential,
	error::{AuthorizationError, Error, UpstreamError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient},
	issuer::KeyIssuer,
	oauth::oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{
			HeaderMap, HeaderValue, StatusCode,
			header::{CONTENT_TYPE, RETRY_AFTER},
		},
	},
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl fmt::Display for FakeTransportError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone)]
enum Reply {
	Json { status: u16, body: &'static str, retry_after: Option<&'static str> },
	Throttled(Duration),
	Unreachable,
}

#[derive(Clone, Debug)]
struct Recorded {
	path: String,
	headers: HeaderMap,
}

#[derive(Clone, Default)]
struct FakeHttpClient {
	replies: Arc<HashMap<&'static str, Reply>>,
	log: Arc<Mutex<Vec<Recorded>>>,
}
impl FakeHttpClient {
	fn new(replies: impl IntoIterator<Item = (&'static str, Reply)>) -> Self {
		Self { replies: Arc::new(replies.into_iter().collect()), log: Default::default() }
	}

	fn paths(&self) -> Vec<String> {
		self.log.lock().iter().map(|recorded| recorded.path.clone()).collect()
	}

	fn headers_for(&self, path: &str) -> HeaderMap {
		self.log
			.lock()
			.iter()
			.find(|recorded| recorded.path == path)
			.map(|recorded| recorded.headers.clone())
			.expect("Request should have been recorded.")
	}
}
impl UpstreamHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, client: self.clone() }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	client: FakeHttpClient,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let client = self.client.clone();

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);

			let path = request.uri().path().to_owned();

			let headers = request.headers().clone();

			client.log.lock().push(Recorded { path: path.clone(), headers });

			match client.replies.get(path.as_str()).cloned().unwrap_or(Reply::Unreachable) {
				Reply::Json { status, body, retry_after } => {
					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");
					response
						.headers_mut()
						.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

					if let Some(hint) = retry_after {
						response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static(hint));
					}

					slot.store(ResponseMetadata::from_response(&response));

					Ok(response)
				},
				Reply::Throttled(retry_after) => {
					slot.store(ResponseMetadata {
						status: Some(429),
						retry_after: Some(retry_after),
					});

					Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
				},
				Reply::Unreachable => Err(HttpClientError::Other(format!("no route to {path}"))),
			}
		})
	}
}

const OPERATORS: &str = "/rest/v1/operators";
const TOKEN: &str = "/api/v2/oauth/token";
const KEYS: &str = "/api/v2/tailnet/example.com/keys";

fn verified() -> (&'static str, Reply) {
	(OPERATORS, Reply::Json { status: 200, body: r#"{"verified":true}"#, retry_after: None })
}

fn token_ok() -> (&'static str, Reply) {
	(
		TOKEN,
		Reply::Json {
			status: 200,
			body: r#"{"access_token":"fake-access","token_type":"bearer","expires_in":3600}"#,
			retry_after: None,
		},
	)
}

fn issuer(client: &FakeHttpClient) -> KeyIssuer<FakeHttpClient> {
	let config = common::load(&common::env("https://store.fake", "https://provider.fake"))
		.expect("Test configuration should load.");

	KeyIssuer::with_http_client(config, client.clone())
}

fn caller() -> BearerCredential {
	BearerCredential::parse(Some(common::CALLER)).expect("Caller credential should parse.")
}

#[tokio::test]
async fn pipeline_calls_upstreams_in_order_with_scoped_credentials() {
	let client = FakeHttpClient::new([
		verified(),
		token_ok(),
		(
			KEYS,
			Reply::Json {
				status: 200,
				body: r#"{"key":"tskey-fake","expires":"2024-01-01T00:05:00Z"}"#,
				retry_after: None,
			},
		),
	]);
	let issued = issuer(&client).issue(&caller()).await.expect("Pipeline should succeed.");

	assert_eq!(issued.auth_key.expose(), "tskey-fake");
	assert_eq!(client.paths(), [OPERATORS, TOKEN, KEYS]);

	let store = client.headers_for(OPERATORS);

	assert_eq!(store.get("apikey").and_then(|v| v.to_str().ok()), Some(common::ANON_KEY));
	assert_eq!(store.get("authorization").and_then(|v| v.to_str().ok()), Some(common::CALLER));

	let token = client.headers_for(TOKEN);

	assert!(
		token
			.get("authorization")
			.and_then(|v| v.to_str().ok())
			.is_some_and(|value| value.starts_with("Basic ")),
		"Token exchange must authenticate with HTTP Basic."
	);

	let keys = client.headers_for(KEYS);

	assert_eq!(keys.get("authorization").and_then(|v| v.to_str().ok()), Some("Bearer fake-access"));
}

#[tokio::test]
async fn throttled_token_exchange_surfaces_metadata() {
	let client = FakeHttpClient::new([verified(), (TOKEN, Reply::Throttled(Duration::seconds(5)))]);
	let err = issuer(&client).issue(&caller()).await.expect_err("Token exchange should fail.");

	match &err {
		Error::Upstream(UpstreamError::TokenExchange { status, retry_after, .. }) => {
			assert_eq!(*status, Some(429));
			assert_eq!(*retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(err.public_message(), "OAuth failed");
	assert_eq!(client.paths(), [OPERATORS, TOKEN]);
}

#[tokio::test]
async fn key_endpoint_status_and_retry_hint_are_kept() {
	let client = FakeHttpClient::new([
		verified(),
		token_ok(),
		(
			KEYS,
			Reply::Json {
				status: 429,
				body: r#"{"message":"slow down"}"#,
				retry_after: Some("30"),
			},
		),
	]);
	let err = issuer(&client).issue(&caller()).await.expect_err("Key creation should fail.");

	assert!(matches!(
		err,
		Error::Upstream(UpstreamError::KeyCreate { status: Some(429), retry_after: Some(hint), .. })
			if hint == Duration::seconds(30)
	));
}

#[tokio::test]
async fn store_transport_failure_is_forbidden() {
	let client = FakeHttpClient::new([token_ok()]);
	let err = issuer(&client).issue(&caller()).await.expect_err("Lookup should fail.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::Lookup { status: None, .. })));
	assert_eq!(err.status(), 403);
	assert_eq!(client.paths(), [OPERATORS]);
}

#[tokio::test]
async fn null_operator_body_is_not_found() {
	let client = FakeHttpClient::new([
		(OPERATORS, Reply::Json { status: 200, body: "null", retry_after: None }),
		token_ok(),
	]);
	let err = issuer(&client).authorize(&caller()).await.expect_err("Lookup should deny.");

	assert!(matches!(err, AuthorizationError::NotFound));
	assert_eq!(client.paths(), [OPERATORS]);
}
