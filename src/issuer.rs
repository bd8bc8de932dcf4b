//! Key issuance pipeline.
//!
//! [`KeyIssuer::issue`] runs three upstream stages strictly in order: the operator lookup,
//! the client-credentials grant, and key creation. Each stage depends on the previous one, the
//! first failure ends the request, and nothing is retried or cached between invocations.

// self
use crate::{
	_prelude::*,
	auth::{BearerCredential, Secret},
	config::Config,
	error::{AuthorizationError, ConfigError, UpstreamError},
	http::{ReqwestHttpClient, UpstreamHttpClient},
	identity::OperatorDirectory,
	oauth::ClientCredentialsExchange,
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::{IssuedKey, KeyFactory},
};

/// Issuer specialized for the crate's default reqwest transport.
pub type ReqwestKeyIssuer = KeyIssuer<ReqwestHttpClient>;

/// Exchanges a verified operator's credential for a provider pre-authorization key.
///
/// The issuer holds only immutable configuration and a shared HTTP transport, so one
/// instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct KeyIssuer<C = ReqwestHttpClient>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// HTTP client used for every upstream request.
	pub http_client: Arc<C>,
	/// Identity store client.
	pub directory: OperatorDirectory,
	/// Provider token exchange.
	pub exchange: ClientCredentialsExchange,
	/// Provider key factory.
	pub keys: KeyFactory,
	tailnet: String,
}
impl<C> KeyIssuer<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Creates an issuer that reuses the caller-provided transport.
	pub fn with_http_client(config: Config, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			directory: OperatorDirectory::new(&config.identity),
			exchange: ClientCredentialsExchange::new(&config.provider),
			keys: KeyFactory::new(&config.provider, config.key_policy),
			tailnet: config.provider.tailnet,
		}
	}

	/// Tailnet the issued keys join.
	pub fn tailnet(&self) -> &str {
		&self.tailnet
	}

	/// Runs the full pipeline for one caller.
	pub async fn issue(&self, credential: &BearerCredential) -> Result<IssuedKey> {
		self.authorize(credential).await?;

		let access_token = self.access_token().await?;

		Ok(self.create_key(&access_token).await?)
	}

	/// Confirms the caller is a verified operator.
	pub async fn authorize(&self, credential: &BearerCredential) -> Result<(), AuthorizationError> {
		run_stage(Stage::Authorize, async {
			self.directory.verify(self.http_client.as_ref(), credential).await
		})
		.await
	}

	/// Obtains a fresh provider access token.
	pub async fn access_token(&self) -> Result<Secret, UpstreamError> {
		run_stage(Stage::TokenExchange, async {
			self.exchange.access_token(self.http_client.as_ref()).await
		})
		.await
	}

	/// Creates a key with a previously obtained access token.
	pub async fn create_key(&self, access_token: &Secret) -> Result<IssuedKey, UpstreamError> {
		run_stage(Stage::KeyCreate, async {
			self.keys.create(self.http_client.as_ref(), access_token).await
		})
		.await
	}
}
impl KeyIssuer<ReqwestHttpClient> {
	/// Creates an issuer with its own reqwest transport (redirects disabled).
	pub fn new(config: Config) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(config, ReqwestHttpClient::try_default()?))
	}
}
impl<C> Debug for KeyIssuer<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyIssuer")
			.field("directory", &self.directory)
			.field("keys", &self.keys)
			.field("tailnet", &self.tailnet)
			.finish()
	}
}

/// Upstream detail a failed stage reports alongside its error message.
trait StageFailure: Display {
	fn status(&self) -> Option<u16>;

	fn retry_after(&self) -> Option<Duration>;
}
impl StageFailure for AuthorizationError {
	fn status(&self) -> Option<u16> {
		match self {
			AuthorizationError::Lookup { status, .. } => *status,
			AuthorizationError::NotFound | AuthorizationError::NotVerified => None,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		None
	}
}
impl StageFailure for UpstreamError {
	fn status(&self) -> Option<u16> {
		UpstreamError::status(self)
	}

	fn retry_after(&self) -> Option<Duration> {
		UpstreamError::retry_after(self)
	}
}

async fn run_stage<T, E, Fut>(stage: Stage, fut: Fut) -> Result<T, E>
where
	E: StageFailure,
	Fut: Future<Output = Result<T, E>>,
{
	let span = StageSpan::new(stage);

	obs::record_stage_outcome(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_stage_outcome(stage, StageOutcome::Success),
		Err(err) => {
			obs::record_stage_outcome(stage, StageOutcome::Failure);
			obs::report_stage_failure(stage, err.status(), err.retry_after(), err);
		},
	}

	result
}
