// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, AuthenticatedAs, DeviceId, TokenSecret},
	store::{SessionRecord, StoreKey},
};

/// Point-in-time view of a session, suitable for logging or exporting as JSON.
///
/// Secrets keep their redacting `Debug` output but serialize verbatim.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	/// OAuth client identifier.
	pub application_id: ApplicationId,
	/// Application secret, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub application_secret: Option<TokenSecret>,
	/// Principal the session authenticates as.
	pub authenticated_as: AuthenticatedAs,
	/// Current bearer token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Current refresh token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Registered device identity.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_id: Option<DeviceId>,
	/// Local expiry of `access_token`.
	#[serde(skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub expires_on: Option<OffsetDateTime>,
	/// Whether credentials are written to the store.
	pub persist_session: bool,
	/// Whether anonymous device registration is enabled.
	pub auto_register_device: bool,
	/// API base URL.
	pub base_url: Url,
	/// Token endpoint.
	pub token_url: Url,
	/// Device registration endpoint.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub register_url: Option<Url>,
	/// Key the session persists under.
	pub storage_key: StoreKey,
	/// Requests waiting for authentication.
	pub pending_requests: usize,
}
impl SessionSnapshot {
	/// The persistable subset, e.g. to seed another session through
	/// [`SessionOptionsBuilder::session`](crate::session::SessionOptionsBuilder::session).
	pub fn record(&self) -> SessionRecord {
		SessionRecord {
			application_secret: self.application_secret.clone(),
			access_token: self.access_token.clone(),
			refresh_token: self.refresh_token.clone(),
			device_id: self.device_id.clone(),
			expires_on: self.access_token.as_ref().and(self.expires_on),
		}
	}
}
