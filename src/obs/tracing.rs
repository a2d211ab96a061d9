// self
use crate::{
	_prelude::*,
	error::{ProtocolError, RequestError},
	obs::FlowKind,
	store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by session flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_session.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Logs that an API request was parked until the session authenticates.
pub fn log_request_queued(method: &str, queued: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method, queued, "Request queued until the session authenticates.");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, queued);
}

/// Logs that the API rejected a bearer token and how the request is retried.
pub fn log_token_rejected(method: &str, requeued: bool) {
	#[cfg(feature = "tracing")]
	tracing::info!(method, requeued, "API rejected the access token; retrying the request.");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, requeued);
}

/// Logs a failed credential acquisition.
pub fn log_auth_failure(kind: FlowKind, error: &RequestError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		flow = kind.as_str(),
		error_kind = error.kind(),
		%error,
		"Failed to obtain an access token."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, error);
}

/// Logs that no credential strategy applies to the session.
pub fn log_no_strategy() {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		"No credential strategy applies: no application secret, no refresh token, and device \
		 registration is disabled."
	);
}

/// Logs a persistence failure that did not abort the surrounding operation.
pub fn log_persist_failure(error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "Failed to persist session credentials.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

/// Logs an attempt to settle a request deferred twice.
pub fn log_double_completion(method: &str, error: ProtocolError) {
	#[cfg(feature = "tracing")]
	tracing::error!(method, %error, "Request outcome was delivered twice.");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, error);
}
