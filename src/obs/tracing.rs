// self
use crate::{_prelude::*, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: Stage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("tailnet_authkey.stage", stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warn-level event for a failed stage.
///
/// Only the error's `Display` output, the upstream status, and the Retry-After hint (whole
/// seconds) are recorded; error types in this crate never render credentials, tokens, or keys.
pub fn report_stage_failure(
	stage: Stage,
	status: Option<u16>,
	retry_after: Option<Duration>,
	error: &dyn Display,
) {
	#[cfg(feature = "tracing")]
	{
		let retry_after_secs = retry_after.map(|hint| hint.whole_seconds());

		tracing::warn!(stage = stage.as_str(), status, retry_after_secs, %error, "stage failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, status, retry_after, error);
	}
}

/// Emits a warn-level event when the process starts without a usable issuer.
pub fn report_issuance_disabled(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "key issuance disabled; requests will receive 500");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing() {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
