//! Persistence contract and built-in adapters for session credentials.
//!
//! A session stores one [`SessionRecord`] under its [`StoreKey`]. Browsers pick between local
//! storage and cookies; here that choice is made by injecting a [`PersistenceAdapter`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, AuthenticatedAs, Credentials, DeviceId, TokenSecret},
};

/// Boxed future returned by [`PersistenceAdapter`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value backend used to persist session records.
pub trait PersistenceAdapter
where
	Self: Send + Sync,
{
	/// Loads the record stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<SessionRecord>>;

	/// Stores or replaces the record under `key`.
	fn set<'a>(&'a self, key: &'a StoreKey, record: SessionRecord) -> StoreFuture<'a, ()>;

	/// Removes the record under `key`; missing keys are not an error.
	fn erase<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`PersistenceAdapter`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures (e.g., serde) surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Storage key of a session: `<prefix>_<authenticated_as>_<application_id>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);
impl StoreKey {
	/// Builds the key for a session identity.
	pub fn new(
		prefix: &str,
		authenticated_as: AuthenticatedAs,
		application_id: &ApplicationId,
	) -> Self {
		Self(format!("{prefix}_{authenticated_as}_{application_id}"))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Persisted subset of a session. Only non-empty fields are written.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	/// Application secret, when the session authenticates as the application.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub application_secret: Option<TokenSecret>,
	/// Last issued bearer token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Last issued refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Registered device identity.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_id: Option<DeviceId>,
	/// Local expiry of `access_token`.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		with = "time::serde::rfc3339::option"
	)]
	pub expires_on: Option<OffsetDateTime>,
}
impl SessionRecord {
	/// Captures the persistable state of a session.
	pub fn capture(application_secret: Option<&TokenSecret>, credentials: &Credentials) -> Self {
		let keep = |secret: Option<&TokenSecret>| secret.filter(|s| !s.is_empty()).cloned();

		Self {
			application_secret: keep(application_secret),
			access_token: keep(credentials.access_token.as_ref()),
			refresh_token: keep(credentials.refresh_token.as_ref()),
			device_id: credentials.device_id.clone(),
			expires_on: credentials.access_token.as_ref().and(credentials.expires_on),
		}
	}

	/// Overwrites the given state with every field present in this record.
	pub fn merge_into(
		self,
		application_secret: &mut Option<TokenSecret>,
		credentials: &mut Credentials,
	) {
		let present = |secret: Option<TokenSecret>| secret.filter(|s| !s.is_empty());

		if let Some(secret) = present(self.application_secret) {
			*application_secret = Some(secret);
		}
		if let Some(token) = present(self.access_token) {
			credentials.access_token = Some(token);
			// A token restored without its expiry must not inherit a stale one.
			credentials.expires_on = self.expires_on;
		} else if let Some(expires_on) = self.expires_on {
			credentials.expires_on = Some(expires_on);
		}
		if let Some(token) = present(self.refresh_token) {
			credentials.refresh_token = Some(token);
		}
		if let Some(device_id) = self.device_id {
			credentials.device_id = Some(device_id);
		}
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}
}
impl Debug for SessionRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let redact = |secret: &Option<TokenSecret>| secret.as_ref().map(|_| "<redacted>");

		f.debug_struct("SessionRecord")
			.field("application_secret", &redact(&self.application_secret))
			.field("access_token", &redact(&self.access_token))
			.field("refresh_token", &redact(&self.refresh_token))
			.field("device_id", &self.device_id)
			.field("expires_on", &self.expires_on)
			.finish()
	}
}
