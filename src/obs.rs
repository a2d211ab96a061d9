//! Optional observability helpers for session flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_session.flow` with the `flow`
//!   (strategy or request) and `stage` (call site) fields, plus log events for queueing, token
//!   rejection, and authentication failures.
//! - Enable `metrics` to increment the `oauth2_session_flow_total` counter for every recorded
//!   outcome, labeled by `flow` + `outcome`.

mod tracing;

pub use tracing::*;

// self
use crate::{_prelude::*, refresh::RefreshStrategy};

/// Flow kinds observed by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// `client_credentials` token exchange.
	ClientCredentials,
	/// `refresh_token` token exchange.
	RefreshToken,
	/// Anonymous device registration.
	DeviceRegistration,
	/// Regular API or external request.
	Request,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::RefreshToken => "refresh_token",
			FlowKind::DeviceRegistration => "device_registration",
			FlowKind::Request => "request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<RefreshStrategy> for FlowKind {
	fn from(strategy: RefreshStrategy) -> Self {
		match strategy {
			RefreshStrategy::ClientCredentials => FlowKind::ClientCredentials,
			RefreshStrategy::RefreshToken => FlowKind::RefreshToken,
			RefreshStrategy::DeviceRegistration => FlowKind::DeviceRegistration,
		}
	}
}

/// Outcome labels recorded for each flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or listeners.
	Failure,
	/// Refresh skipped because a concurrent attempt already finished.
	Coalesced,
	/// Request parked until the session authenticates.
	Queued,
	/// Request re-queued after the API rejected its token.
	Retried,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Coalesced => "coalesced",
			FlowOutcome::Queued => "queued",
			FlowOutcome::Retried => "retried",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Counts one `outcome` of `kind` on `oauth2_session_flow_total`.
///
/// Compiles to nothing unless the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		let (flow, outcome) = (kind.as_str(), outcome.as_str());

		metrics::counter!("oauth2_session_flow_total", "flow" => flow, "outcome" => outcome)
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
