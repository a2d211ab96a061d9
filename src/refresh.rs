//! Credential refresh for [`Session`].
//!
//! At most one refresh talks to the token endpoint at a time. Callers record the attempt counter
//! before asking for a refresh; if another attempt finished while they waited for the
//! single-flight guard, they share its outcome without a network call: its success as
//! [`RefreshOutcome::Coalesced`], its failure as the same error.

mod metrics;
mod strategy;

pub use metrics::RefreshMetrics;
pub use strategy::RefreshStrategy;

// self
use crate::{
	_prelude::*,
	error::RequestError,
	events::{AuthResponse, SessionEvent},
	http::{self, TransportClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::strategy::Grant,
	request::{self, RequestSpec, ResponseOutcome},
	session::{Session, SessionFuture},
};

/// What a call to [`Session::refresh`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// A new token was obtained with the given strategy.
	Refreshed(RefreshStrategy),
	/// Another refresh completed first; its token is used.
	Coalesced,
	/// No strategy applies (no secret, no refresh token, registration disabled).
	Skipped,
}

impl<C> Session<C>
where
	C: ?Sized + TransportClient,
{
	/// Obtains a new access token, then replays every queued request.
	///
	/// Emits `authentication:success` and `authenticated` on success and
	/// `authentication:failure` on failure. Queued requests stay queued after a failure. A call
	/// that waits behind an in-flight attempt returns that attempt's outcome and emits nothing.
	pub async fn refresh(&self) -> Result<RefreshOutcome, RequestError> {
		let observed = self.inner.state.lock().attempts;

		self.clone().refresh_from(observed).await
	}

	pub(crate) fn spawn_refresh(&self, observed: u64) {
		self.inner.runtime.spawn(self.clone().refresh_from(observed));
	}

	fn refresh_from(self, observed: u64) -> SessionFuture<Result<RefreshOutcome, RequestError>> {
		Box::pin(async move {
			let _singleflight = self.inner.refresh_guard.lock().await;
			let (strategy, spec) = {
				let state = self.inner.state.lock();
				let selected = RefreshStrategy::select(
					state.application_secret.is_some(),
					state.credentials.refresh_token.is_some(),
					self.inner.options.auto_register_device,
				);

				if state.attempts != observed {
					self.inner.refresh_metrics.record_coalesced();

					if let Some(strategy) = selected {
						obs::record_flow_outcome(strategy.into(), FlowOutcome::Coalesced);
					}

					return match &state.last_failure {
						Some(e) => Err(e.clone()),
						None => Ok(RefreshOutcome::Coalesced),
					};
				}

				let Some(strategy) = selected else {
					obs::log_no_strategy();

					return Ok(RefreshOutcome::Skipped);
				};
				let spec = strategy.request_spec(
					&self.inner.options,
					state.application_secret.as_ref(),
					state.credentials.refresh_token.as_ref(),
				);

				(strategy, spec)
			};
			let kind = FlowKind::from(strategy);
			let span = FlowSpan::new(kind, "refresh");

			obs::record_flow_outcome(kind, FlowOutcome::Attempt);
			self.inner.refresh_metrics.record_attempt();

			let exchanged = match spec {
				Ok(spec) => span.instrument(self.exchange(strategy, spec)).await,
				Err(e) => Err(e),
			};

			match exchanged {
				Ok((grant, payload)) => {
					self.inner.refresh_metrics.record_success();
					obs::record_flow_outcome(kind, FlowOutcome::Success);
					self.complete(strategy, grant, payload).await;

					Ok(RefreshOutcome::Refreshed(strategy))
				},
				Err(e) => {
					self.inner.refresh_metrics.record_failure();
					obs::record_flow_outcome(kind, FlowOutcome::Failure);
					obs::log_auth_failure(kind, &e);

					{
						let mut state = self.inner.state.lock();

						state.attempts += 1;
						state.last_failure = Some(e.clone());
					}

					self.inner.events.emit(&SessionEvent::AuthenticationFailure(e.clone()));

					Err(e)
				},
			}
		})
	}

	async fn exchange(
		&self,
		strategy: RefreshStrategy,
		spec: RequestSpec,
	) -> Result<(Grant, Value), RequestError> {
		let request = request::build_http_request(&self.inner.options.base_url, &spec, None)?;
		let response = http::execute(self.inner.http_client.as_ref(), request).await?;
		let payload = match request::classify_response(response, false, false) {
			ResponseOutcome::Success(response) => response
				.into_payload()
				.ok_or_else(|| RequestError::unexpected("token endpoint returned no payload"))?,
			ResponseOutcome::TokenRejected(api) => return Err(RequestError::Api(api)),
			ResponseOutcome::Failed(e) => return Err(e),
		};
		let grant = strategy.parse_grant(&payload)?;

		Ok((grant, payload))
	}

	async fn complete(&self, strategy: RefreshStrategy, grant: Grant, payload: Value) {
		grant.apply(&mut self.inner.state.lock().credentials, OffsetDateTime::now_utc());

		let persisted =
			if self.inner.options.persist_session { self.write_record().await } else { Ok(()) };

		if let Err(e) = persisted {
			obs::log_persist_failure(&e);
		}

		let replay = {
			let mut state = self.inner.state.lock();

			state.generation += 1;
			state.attempts += 1;
			state.last_failure = None;

			state.queue.drain()
		};

		for pending in replay {
			self.dispatch(pending);
		}

		let response = AuthResponse { strategy, payload };

		self.inner.events.emit(&SessionEvent::AuthenticationSuccess(response.clone()));
		self.inner.events.emit(&SessionEvent::Authenticated(response));
	}
}
