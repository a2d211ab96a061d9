//! Typed listener registry for session authentication events.

// self
use crate::{_prelude::*, error::RequestError, refresh::RefreshStrategy};

/// Shared listener handle; keep a clone to unregister it with [`EventEmitter::off`].
pub type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Authentication event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// A refresh strategy obtained a new token.
	AuthenticationSuccess,
	/// The session is authenticated; fired right after [`EventKind::AuthenticationSuccess`].
	Authenticated,
	/// A refresh strategy failed.
	AuthenticationFailure,
}
impl EventKind {
	/// Returns the wire label of the event.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthenticationSuccess => "authentication:success",
			Self::Authenticated => "authenticated",
			Self::AuthenticationFailure => "authentication:failure",
		}
	}
}
impl Display for EventKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token endpoint payload that completed a refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthResponse {
	/// Strategy that produced the token.
	pub strategy: RefreshStrategy,
	/// Decoded response body, as returned by the endpoint.
	pub payload: Value,
}

/// Event delivered to listeners.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
	/// See [`EventKind::AuthenticationSuccess`].
	AuthenticationSuccess(AuthResponse),
	/// See [`EventKind::Authenticated`].
	Authenticated(AuthResponse),
	/// See [`EventKind::AuthenticationFailure`].
	AuthenticationFailure(RequestError),
}
impl SessionEvent {
	/// Kind used to route this event.
	pub fn kind(&self) -> EventKind {
		match self {
			Self::AuthenticationSuccess(_) => EventKind::AuthenticationSuccess,
			Self::Authenticated(_) => EventKind::Authenticated,
			Self::AuthenticationFailure(_) => EventKind::AuthenticationFailure,
		}
	}
}

/// Listener registry keyed by [`EventKind`]. Delivery is synchronous and in registration order.
#[derive(Default)]
pub struct EventEmitter {
	listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
}
impl EventEmitter {
	/// Registers a listener for `kind`.
	pub fn on(&self, kind: EventKind, listener: Listener) {
		self.listeners.lock().entry(kind).or_default().push(listener);
	}

	/// Removes the first registration of `listener` for `kind`; returns whether one was found.
	pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
		let mut listeners = self.listeners.lock();
		let Some(registered) = listeners.get_mut(&kind) else {
			return false;
		};
		let Some(index) = registered.iter().position(|l| Arc::ptr_eq(l, listener)) else {
			return false;
		};

		registered.remove(index);

		true
	}

	/// Delivers `event` to every listener of its kind and returns how many were called.
	pub fn emit(&self, event: &SessionEvent) -> usize {
		// Snapshot first so listeners can register or unregister while being called.
		let snapshot = self.listeners.lock().get(&event.kind()).cloned().unwrap_or_default();

		for listener in &snapshot {
			listener(event);
		}

		snapshot.len()
	}

	/// Number of listeners registered for `kind`.
	pub fn listener_count(&self, kind: EventKind) -> usize {
		self.listeners.lock().get(&kind).map_or(0, Vec::len)
	}
}
impl Debug for EventEmitter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let listeners = self.listeners.lock();

		f.debug_map()
			.entries(listeners.iter().map(|(kind, list)| (kind.as_str(), list.len())))
			.finish()
	}
}
