// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, TokenSecret},
	error::ConfigError,
	store::SessionRecord,
};

/// Validated configuration for a [`Session`](crate::session::Session).
#[derive(Clone, Debug)]
pub struct SessionOptions {
	/// OAuth client identifier.
	pub application_id: ApplicationId,
	/// Optional client secret; when present the session authenticates as the application.
	pub application_secret: Option<TokenSecret>,
	/// Base URL that API-relative methods are appended to. Always ends with `/`.
	pub base_url: Url,
	/// Token endpoint used by the client-credentials and refresh-token strategies.
	pub token_url: Url,
	/// Device registration endpoint.
	pub register_url: Option<Url>,
	/// Restore credentials from the store on start and write them back after every refresh.
	pub persist_session: bool,
	/// Register an anonymous device when no other strategy applies.
	pub auto_register_device: bool,
	/// Prefix of the storage key.
	pub storage_prefix: String,
	/// Explicit record merged over whatever the store returned.
	pub session: Option<SessionRecord>,
}
impl SessionOptions {
	/// Default storage key prefix.
	pub const DEFAULT_STORAGE_PREFIX: &str = "_oauth2_session";

	/// Starts a builder for the given application.
	pub fn builder(application_id: ApplicationId) -> SessionOptionsBuilder {
		SessionOptionsBuilder::new(application_id)
	}
}

/// Builder for [`SessionOptions`] values.
#[derive(Debug)]
pub struct SessionOptionsBuilder {
	application_id: ApplicationId,
	application_secret: Option<TokenSecret>,
	base_url: Option<Url>,
	token_url: Option<Url>,
	register_url: Option<Url>,
	persist_session: bool,
	auto_register_device: bool,
	storage_prefix: String,
	session: Option<SessionRecord>,
}
impl SessionOptionsBuilder {
	/// Creates a builder with persistence and device registration enabled.
	pub fn new(application_id: ApplicationId) -> Self {
		Self {
			application_id,
			application_secret: None,
			base_url: None,
			token_url: None,
			register_url: None,
			persist_session: true,
			auto_register_device: true,
			storage_prefix: SessionOptions::DEFAULT_STORAGE_PREFIX.into(),
			session: None,
		}
	}

	/// Sets the client secret. Empty strings count as no secret.
	pub fn application_secret(mut self, secret: impl Into<String>) -> Self {
		self.application_secret = TokenSecret::non_empty(secret);

		self
	}

	/// Sets the API base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Sets the device registration endpoint.
	pub fn register_url(mut self, url: Url) -> Self {
		self.register_url = Some(url);

		self
	}

	/// Toggles persistence.
	pub fn persist_session(mut self, enabled: bool) -> Self {
		self.persist_session = enabled;

		self
	}

	/// Toggles anonymous device registration.
	pub fn auto_register_device(mut self, enabled: bool) -> Self {
		self.auto_register_device = enabled;

		self
	}

	/// Overrides the storage key prefix.
	pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.storage_prefix = prefix.into();

		self
	}

	/// Restores an explicit session record, e.g. one captured from another process.
	pub fn session(mut self, record: SessionRecord) -> Self {
		self.session = Some(record);

		self
	}

	/// Consumes the builder and validates the resulting options.
	pub fn build(self) -> Result<SessionOptions, ConfigError> {
		let mut base_url =
			self.base_url.ok_or(ConfigError::MissingEndpoint { endpoint: "base" })?;
		let token_url =
			self.token_url.ok_or(ConfigError::MissingEndpoint { endpoint: "token" })?;

		// Registration is the last strategy, unreachable once a secret is configured.
		if self.auto_register_device
			&& self.application_secret.is_none()
			&& self.register_url.is_none()
		{
			return Err(ConfigError::MissingEndpoint { endpoint: "register" });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Ok(SessionOptions {
			application_id: self.application_id,
			application_secret: self.application_secret,
			base_url,
			token_url,
			register_url: self.register_url,
			persist_session: self.persist_session,
			auto_register_device: self.auto_register_device,
			storage_prefix: self.storage_prefix,
			session: self.session,
		})
	}
}
