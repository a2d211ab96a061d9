//! FIFO buffer for API calls issued before the session holds an access token.

// std
use std::{collections::vec_deque::IntoIter, mem};
// self
use crate::{
	_prelude::*,
	request::{RequestSpec, ResponseDeferred},
};

/// A request waiting for authentication, paired with the deferred its caller holds.
#[derive(Debug)]
pub struct PendingRequest {
	/// Request description, replayed verbatim.
	pub spec: RequestSpec,
	/// Deferred handed back to the caller when the request was first issued.
	pub deferred: ResponseDeferred,
}
impl PendingRequest {
	/// Pairs a request with its deferred.
	pub fn new(spec: RequestSpec, deferred: ResponseDeferred) -> Self {
		Self { spec, deferred }
	}
}

/// Ordered queue of [`PendingRequest`]s.
#[derive(Debug, Default)]
pub struct RequestQueue(VecDeque<PendingRequest>);
impl RequestQueue {
	/// Appends a request to the back of the queue.
	pub fn enqueue(&mut self, pending: PendingRequest) {
		self.0.push_back(pending);
	}

	/// Takes every queued request in insertion order, leaving the queue empty.
	///
	/// Entries are moved out before replay, so a request that gets queued again during replay
	/// waits for the next drain instead of being visited twice.
	pub fn drain(&mut self) -> IntoIter<PendingRequest> {
		mem::take(&mut self.0).into_iter()
	}

	/// Number of waiting requests.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing is waiting.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
