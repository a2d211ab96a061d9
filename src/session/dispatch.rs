//! Request issue, transmission, and token-rejection retry.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::RequestError,
	http::{self, TransportClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	queue::PendingRequest,
	request::{self, ApiResponse, HttpVerb, RequestOptions, ResponseDeferred, ResponseOutcome},
	session::{Session, SessionFuture},
};

impl<C> Session<C>
where
	C: ?Sized + TransportClient,
{
	/// Issues a GET for `method` with `options`' params and callback.
	pub fn get(&self, method: impl Into<String>, options: RequestOptions) -> ResponseDeferred {
		self.request(options.method(method).verb(HttpVerb::Get).return_raw(false))
	}

	/// Issues a form POST for `method` with `options`' params and callback.
	pub fn post(&self, method: impl Into<String>, options: RequestOptions) -> ResponseDeferred {
		self.request(options.method(method).verb(HttpVerb::Post).return_raw(false))
	}

	/// Issues a request and returns the deferred that settles with its outcome.
	///
	/// API requests (relative methods) wait in the queue until a token is held. Absolute URLs
	/// are sent right away without a bearer header.
	pub fn request(&self, options: RequestOptions) -> ResponseDeferred {
		let (spec, callback) = options.into_parts();
		let deferred = ResponseDeferred::new();

		if let Some(callback) = callback {
			request::attach_callback(&deferred, callback);
		}

		self.dispatch(PendingRequest::new(spec, deferred.clone()));

		deferred
	}

	pub(crate) fn dispatch(&self, pending: PendingRequest) {
		let _span = FlowSpan::new(FlowKind::Request, "dispatch").entered();
		let mut state = self.inner.state.lock();
		let token = state.credentials.access_token.clone();

		if token.is_none() && pending.spec.is_api_request() {
			obs::log_request_queued(&pending.spec.method, state.queue.len() + 1);
			state.queue.enqueue(pending);
			drop(state);
			obs::record_flow_outcome(FlowKind::Request, FlowOutcome::Queued);

			return;
		}

		let generation = state.generation;

		drop(state);
		obs::record_flow_outcome(FlowKind::Request, FlowOutcome::Attempt);
		self.inner.runtime.spawn(self.clone().transmit(pending, token, generation));
	}

	fn transmit(
		self,
		pending: PendingRequest,
		token: Option<TokenSecret>,
		generation: u64,
	) -> SessionFuture<()> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::Request, "transmit");
			let spec = &pending.spec;
			let outcome = match request::build_http_request(
				&self.inner.options.base_url,
				spec,
				token.as_ref(),
			) {
				Ok(http_request) => {
					let sent = http::execute(self.inner.http_client.as_ref(), http_request);

					match span.instrument(sent).await {
						Ok(response) => request::classify_response(
							response,
							spec.is_api_request(),
							spec.return_raw,
						),
						Err(e) => ResponseOutcome::Failed(e),
					}
				},
				Err(e) => ResponseOutcome::Failed(e),
			};

			match outcome {
				ResponseOutcome::Success(response) => settle(&pending, Ok(response)),
				ResponseOutcome::Failed(e) => settle(&pending, Err(e)),
				ResponseOutcome::TokenRejected(_) => self.retry_rejected(pending, generation),
			}
		})
	}

	/// Re-sends a rejected request once a token newer than the one it carried is available.
	fn retry_rejected(&self, pending: PendingRequest, generation: u64) {
		let mut state = self.inner.state.lock();

		if state.generation != generation {
			drop(state);
			obs::log_token_rejected(&pending.spec.method, false);
			self.dispatch(pending);

			return;
		}

		let attempt = state.attempts;

		obs::log_token_rejected(&pending.spec.method, true);
		state.queue.enqueue(pending);
		drop(state);
		obs::record_flow_outcome(FlowKind::Request, FlowOutcome::Retried);
		self.spawn_refresh(attempt);
	}
}

fn settle(pending: &PendingRequest, outcome: Result<ApiResponse, RequestError>) {
	let flow_outcome = if outcome.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	obs::record_flow_outcome(FlowKind::Request, flow_outcome);

	let settled = match outcome {
		Ok(response) => pending.deferred.resolve(response),
		Err(e) => pending.deferred.reject(e),
	};

	if let Err(e) = settled {
		obs::log_double_completion(&pending.spec.method, e);
	}
}
