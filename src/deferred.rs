//! One-shot result container with multi-subscriber callbacks.
//!
//! A [`Deferred`] starts pending and settles exactly once, either resolved with a value or
//! rejected with an error. Subscribers registered while pending run in registration order when
//! it settles; subscribers registered afterwards run synchronously inside
//! [`Deferred::subscribe`]. Completing twice is reported as [`ProtocolError::AlreadyCompleted`].
//!
//! The deferred is also awaitable: `deferred.await` (or [`Deferred::wait`]) yields the outcome
//! as a `Result`.

// std
use std::{
	future::IntoFuture,
	mem,
	task::{Context, Poll, Waker},
};
// self
use crate::{_prelude::*, error::ProtocolError};

type ResolveFn<T> = Box<dyn FnOnce(T) + Send>;
type RejectFn<E> = Box<dyn FnOnce(E) + Send>;

struct Subscriber<T, E> {
	on_resolve: Option<ResolveFn<T>>,
	on_reject: Option<RejectFn<E>>,
}
impl<T, E> Subscriber<T, E> {
	fn deliver(self, outcome: Result<T, E>) {
		match outcome {
			Ok(value) =>
				if let Some(on_resolve) = self.on_resolve {
					on_resolve(value);
				},
			Err(error) =>
				if let Some(on_reject) = self.on_reject {
					on_reject(error);
				},
		}
	}
}

enum State<T, E> {
	Pending { subscribers: Vec<Subscriber<T, E>>, wakers: Vec<Waker> },
	Resolved(T),
	Rejected(E),
}
impl<T, E> State<T, E>
where
	T: Clone,
	E: Clone,
{
	fn settled(&self) -> Option<Result<T, E>> {
		match self {
			Self::Pending { .. } => None,
			Self::Resolved(value) => Some(Ok(value.clone())),
			Self::Rejected(error) => Some(Err(error.clone())),
		}
	}
}

/// One-shot asynchronous result handle; clones share the same state.
pub struct Deferred<T, E>(Arc<Mutex<State<T, E>>>);
impl<T, E> Deferred<T, E>
where
	T: 'static + Clone + Send,
	E: 'static + Clone + Send,
{
	/// Creates a pending deferred.
	pub fn new() -> Self {
		Self(Arc::new(Mutex::new(State::Pending { subscribers: Vec::new(), wakers: Vec::new() })))
	}

	/// Registers a resolve/reject pair; runs immediately if the deferred already settled.
	pub fn subscribe<R, J>(&self, on_resolve: R, on_reject: J) -> &Self
	where
		R: 'static + FnOnce(T) + Send,
		J: 'static + FnOnce(E) + Send,
	{
		self.register(Subscriber {
			on_resolve: Some(Box::new(on_resolve)),
			on_reject: Some(Box::new(on_reject)),
		})
	}

	/// Registers a callback that only observes successful outcomes.
	pub fn on_resolve<R>(&self, on_resolve: R) -> &Self
	where
		R: 'static + FnOnce(T) + Send,
	{
		self.register(Subscriber { on_resolve: Some(Box::new(on_resolve)), on_reject: None })
	}

	/// Registers a callback that only observes failures.
	pub fn on_reject<J>(&self, on_reject: J) -> &Self
	where
		J: 'static + FnOnce(E) + Send,
	{
		self.register(Subscriber { on_resolve: None, on_reject: Some(Box::new(on_reject)) })
	}

	/// Settles the deferred with a value.
	pub fn resolve(&self, value: T) -> Result<(), ProtocolError> {
		self.complete(Ok(value))
	}

	/// Settles the deferred with an error.
	pub fn reject(&self, error: E) -> Result<(), ProtocolError> {
		self.complete(Err(error))
	}

	/// Returns the outcome if the deferred has settled.
	pub fn outcome(&self) -> Option<Result<T, E>> {
		self.0.lock().settled()
	}

	/// Returns `true` while no outcome has been recorded.
	pub fn is_pending(&self) -> bool {
		matches!(*self.0.lock(), State::Pending { .. })
	}

	/// Returns a future that completes with the outcome.
	pub fn wait(&self) -> Wait<T, E> {
		Wait { deferred: self.clone() }
	}

	/// Returns `true` when both handles share the same state.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	fn register(&self, subscriber: Subscriber<T, E>) -> &Self {
		let settled = {
			let mut state = self.0.lock();

			match &mut *state {
				State::Pending { subscribers, .. } => {
					subscribers.push(subscriber);

					return self;
				},
				settled => settled.settled(),
			}
		};

		// The lock is released so the subscriber may touch this deferred again.
		if let Some(outcome) = settled {
			subscriber.deliver(outcome);
		}

		self
	}

	fn complete(&self, outcome: Result<T, E>) -> Result<(), ProtocolError> {
		let previous = {
			let mut state = self.0.lock();

			if !matches!(*state, State::Pending { .. }) {
				return Err(ProtocolError::AlreadyCompleted);
			}

			let next = match &outcome {
				Ok(value) => State::Resolved(value.clone()),
				Err(error) => State::Rejected(error.clone()),
			};

			mem::replace(&mut *state, next)
		};

		if let State::Pending { subscribers, wakers } = previous {
			wakers.into_iter().for_each(Waker::wake);

			for subscriber in subscribers {
				subscriber.deliver(outcome.clone());
			}
		}

		Ok(())
	}
}
impl<T, E> Default for Deferred<T, E>
where
	T: 'static + Clone + Send,
	E: 'static + Clone + Send,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T, E> Clone for Deferred<T, E> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}
impl<T, E> Debug for Deferred<T, E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let label = match &*self.0.lock() {
			State::Pending { subscribers, .. } =>
				format!("Pending({} subscribers)", subscribers.len()),
			State::Resolved(_) => "Resolved".into(),
			State::Rejected(_) => "Rejected".into(),
		};

		f.debug_tuple("Deferred").field(&label).finish()
	}
}
impl<T, E> IntoFuture for Deferred<T, E>
where
	T: 'static + Clone + Send,
	E: 'static + Clone + Send,
{
	type IntoFuture = Wait<T, E>;
	type Output = Result<T, E>;

	fn into_future(self) -> Self::IntoFuture {
		Wait { deferred: self }
	}
}

/// Future returned by [`Deferred::wait`].
#[derive(Debug)]
pub struct Wait<T, E> {
	deferred: Deferred<T, E>,
}
impl<T, E> Future for Wait<T, E>
where
	T: Clone,
	E: Clone,
{
	type Output = Result<T, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut state = self.deferred.0.lock();

		if let Some(outcome) = state.settled() {
			return Poll::Ready(outcome);
		}
		match &mut *state {
			State::Pending { wakers, .. }
				if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) =>
				wakers.push(cx.waker().clone()),
			_ => (),
		}

		Poll::Pending
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	type Log = Arc<Mutex<Vec<String>>>;

	fn recorder(
		log: Log,
		tag: &'static str,
	) -> (impl FnOnce(u32) + Send, impl FnOnce(String) + Send) {
		let resolved = log.clone();
		let rejected = log;

		(
			move |value| resolved.lock().push(format!("{tag}:ok:{value}")),
			move |error| rejected.lock().push(format!("{tag}:err:{error}")),
		)
	}

	#[test]
	fn pending_subscribers_run_in_registration_order() {
		let deferred = <Deferred<u32, String>>::new();
		let log = Log::default();
		let (first_ok, first_err) = recorder(log.clone(), "first");
		let (second_ok, second_err) = recorder(log.clone(), "second");

		deferred.subscribe(first_ok, first_err).subscribe(second_ok, second_err);

		assert!(log.lock().is_empty());

		deferred.resolve(7).expect("First completion should succeed.");

		assert_eq!(*log.lock(), vec!["first:ok:7", "second:ok:7"]);
	}

	#[test]
	fn late_subscribers_receive_outcome_synchronously() {
		let deferred = <Deferred<u32, String>>::new();

		deferred.resolve(42).expect("First completion should succeed.");

		let log = Log::default();
		let (ok, err) = recorder(log.clone(), "late");

		deferred.subscribe(ok, err);

		assert_eq!(*log.lock(), vec!["late:ok:42"]);

		let (ok, err) = recorder(log.clone(), "later");

		deferred.subscribe(ok, err);

		assert_eq!(log.lock().len(), 2);
		assert_eq!(deferred.outcome(), Some(Ok(42)));
	}

	#[test]
	fn completing_twice_fails() {
		let deferred = <Deferred<u32, String>>::new();

		deferred.reject("boom".into()).expect("First completion should succeed.");

		assert_eq!(deferred.resolve(1), Err(ProtocolError::AlreadyCompleted));
		assert_eq!(deferred.reject("again".into()), Err(ProtocolError::AlreadyCompleted));
		assert_eq!(deferred.outcome(), Some(Err("boom".into())));
	}

	#[test]
	fn one_sided_callbacks_only_fire_for_their_outcome() {
		let deferred = <Deferred<u32, String>>::new();
		let hits = Arc::new(AtomicUsize::new(0));
		let on_ok = hits.clone();

		deferred.on_resolve(move |_| {
			on_ok.fetch_add(1, Ordering::SeqCst);
		});
		deferred.on_reject(|_| panic!("Reject callback must not run for a resolved deferred."));
		deferred.resolve(1).expect("First completion should succeed.");

		assert_eq!(hits.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn subscriber_may_reenter_the_deferred() {
		let deferred = <Deferred<u32, String>>::new();
		let inner = deferred.clone();
		let log = Log::default();
		let sink = log.clone();

		deferred.on_resolve(move |_| {
			let sink = sink.clone();

			inner.on_resolve(move |value| sink.lock().push(format!("nested:{value}")));
		});
		deferred.resolve(3).expect("First completion should succeed.");

		assert_eq!(*log.lock(), vec!["nested:3"]);
	}

	#[tokio::test]
	async fn awaiting_yields_outcome() {
		let deferred = <Deferred<u32, String>>::new();
		let completer = deferred.clone();
		let handle = tokio::spawn(async move { deferred.await });

		tokio::task::yield_now().await;
		completer.resolve(9).expect("First completion should succeed.");

		let outcome = handle.await.expect("Waiting task should not panic.");

		assert_eq!(outcome, Ok(9));
		assert!(!completer.is_pending());
	}
}
