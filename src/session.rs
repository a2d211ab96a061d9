//! The session: one credential set, its request queue, and its event listeners.
//!
//! A [`Session`] is cheap to clone; clones share the same state. Construction restores any
//! persisted credentials and, when no valid token is held, starts a refresh in the background.
//! API calls issued before a token arrives are queued and replayed, in order, once the refresh
//! succeeds.

mod dispatch;
mod options;
mod snapshot;

pub use options::*;
pub use snapshot::SessionSnapshot;

// crates.io
use tokio::runtime::Handle;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedAs, Credentials, TokenSecret, TokenStatus},
	error::{ConfigError, RequestError},
	events::{EventEmitter, EventKind, Listener, SessionEvent},
	http::TransportClient,
	queue::RequestQueue,
	refresh::RefreshMetrics,
	store::{PersistenceAdapter, SessionRecord, StoreError, StoreKey},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport.
pub type ReqwestSession = Session<ReqwestHttpClient>;

/// Boxed, owned future used where session tasks spawn each other.
pub(crate) type SessionFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Bearer-token session for one application (and, optionally, one registered device).
pub struct Session<C>
where
	C: ?Sized + TransportClient,
{
	pub(crate) inner: Arc<SessionInner<C>>,
}
impl<C> Session<C>
where
	C: ?Sized + TransportClient,
{
	/// Builds a session around a caller-provided transport.
	///
	/// Must be awaited inside a Tokio runtime; request and refresh tasks are spawned on it.
	pub async fn with_http_client(
		options: SessionOptions,
		store: Arc<dyn PersistenceAdapter>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let http_client = http_client.into();
		let runtime = Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let authenticated_as = AuthenticatedAs::from_identity(options.application_secret.as_ref());
		let store_key =
			StoreKey::new(&options.storage_prefix, authenticated_as, &options.application_id);
		let mut application_secret = options.application_secret.clone();
		let mut credentials = Credentials::default();
		let stored =
			if options.persist_session { store.get(&store_key).await? } else { None };

		for record in stored.into_iter().chain(options.session.clone()) {
			record.merge_into(&mut application_secret, &mut credentials);
		}

		let needs_refresh = credentials.status() != TokenStatus::Active;
		let session = Self {
			inner: Arc::new(SessionInner {
				options,
				authenticated_as,
				store_key,
				store,
				events: EventEmitter::default(),
				refresh_guard: AsyncMutex::new(()),
				refresh_metrics: RefreshMetrics::default(),
				runtime,
				state: Mutex::new(SessionState {
					application_secret,
					credentials,
					queue: RequestQueue::default(),
					generation: 0,
					attempts: 0,
					last_failure: None,
				}),
				http_client,
			}),
		};

		if needs_refresh {
			session.spawn_refresh(0);
		}

		Ok(session)
	}

	/// Returns `true` once an access token is held. Expiry is not consulted.
	pub fn authenticated(&self) -> bool {
		self.inner.state.lock().credentials.has_access_token()
	}

	/// Principal this session authenticates as.
	pub fn authenticated_as(&self) -> AuthenticatedAs {
		self.inner.authenticated_as
	}

	/// Options the session was built with.
	pub fn options(&self) -> &SessionOptions {
		&self.inner.options
	}

	/// Key the session persists under.
	pub fn store_key(&self) -> &StoreKey {
		&self.inner.store_key
	}

	/// Copy of the current credentials.
	pub fn credentials(&self) -> Credentials {
		self.inner.state.lock().credentials.clone()
	}

	/// Status of the current access token.
	pub fn token_status(&self) -> TokenStatus {
		self.inner.state.lock().credentials.status()
	}

	/// Number of requests waiting for authentication.
	pub fn pending_requests(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	/// Counters for refresh attempts.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.inner.refresh_metrics
	}

	/// Registers an event listener.
	pub fn on(&self, kind: EventKind, listener: Listener) {
		self.inner.events.on(kind, listener);
	}

	/// Removes the first registration of `listener`; returns whether one was found.
	pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
		self.inner.events.off(kind, listener)
	}

	/// Delivers `event` to its listeners and returns how many ran.
	pub fn emit(&self, event: &SessionEvent) -> usize {
		self.inner.events.emit(event)
	}

	/// Writes the persistable fields to the store.
	pub async fn persist(&self) -> Result<()> {
		Ok(self.write_record().await?)
	}

	/// Erases the stored record. In-memory credentials stay usable.
	pub async fn destroy(&self) -> Result<()> {
		Ok(self.inner.store.erase(&self.inner.store_key).await?)
	}

	/// Explicit view of the session's public state.
	pub fn snapshot(&self) -> SessionSnapshot {
		let state = self.inner.state.lock();
		let options = &self.inner.options;

		SessionSnapshot {
			application_id: options.application_id.clone(),
			application_secret: state.application_secret.clone(),
			authenticated_as: self.inner.authenticated_as,
			access_token: state.credentials.access_token.clone(),
			refresh_token: state.credentials.refresh_token.clone(),
			device_id: state.credentials.device_id.clone(),
			expires_on: state.credentials.expires_on,
			persist_session: options.persist_session,
			auto_register_device: options.auto_register_device,
			base_url: options.base_url.clone(),
			token_url: options.token_url.clone(),
			register_url: options.register_url.clone(),
			storage_key: self.inner.store_key.clone(),
			pending_requests: state.queue.len(),
		}
	}

	pub(crate) async fn write_record(&self) -> Result<(), StoreError> {
		let record = {
			let state = self.inner.state.lock();

			SessionRecord::capture(state.application_secret.as_ref(), &state.credentials)
		};

		self.inner.store.set(&self.inner.store_key, record).await
	}
}
#[cfg(feature = "reqwest")]
impl Session<ReqwestHttpClient> {
	/// Builds a session on a reqwest client with redirects disabled.
	pub async fn new(options: SessionOptions, store: Arc<dyn PersistenceAdapter>) -> Result<Self> {
		Self::with_http_client(options, store, ReqwestHttpClient::without_redirects()?).await
	}
}
impl<C> Clone for Session<C>
where
	C: ?Sized + TransportClient,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}
impl<C> Debug for Session<C>
where
	C: ?Sized + TransportClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.inner.state.lock();

		f.debug_struct("Session")
			.field("application_id", &self.inner.options.application_id)
			.field("authenticated_as", &self.inner.authenticated_as)
			.field("credentials", &state.credentials)
			.field("pending_requests", &state.queue.len())
			.field("generation", &state.generation)
			.field("attempts", &state.attempts)
			.finish()
	}
}

pub(crate) struct SessionInner<C>
where
	C: ?Sized,
{
	pub(crate) options: SessionOptions,
	pub(crate) authenticated_as: AuthenticatedAs,
	pub(crate) store_key: StoreKey,
	pub(crate) store: Arc<dyn PersistenceAdapter>,
	pub(crate) events: EventEmitter,
	/// Held for the whole of a refresh attempt.
	pub(crate) refresh_guard: AsyncMutex<()>,
	pub(crate) refresh_metrics: RefreshMetrics,
	pub(crate) runtime: Handle,
	pub(crate) state: Mutex<SessionState>,
	pub(crate) http_client: Arc<C>,
}

/// Mutable state; credentials and queue share one lock so token checks and enqueues are atomic.
#[derive(Debug)]
pub(crate) struct SessionState {
	pub(crate) application_secret: Option<TokenSecret>,
	pub(crate) credentials: Credentials,
	pub(crate) queue: RequestQueue,
	/// Bumped by every successful refresh.
	pub(crate) generation: u64,
	/// Bumped by every finished refresh attempt, successful or not.
	pub(crate) attempts: u64,
	/// Error of the latest attempt, cleared by a success.
	pub(crate) last_failure: Option<RequestError>,
}
