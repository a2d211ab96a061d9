//! Mutable credential state owned by a session, plus lifecycle helpers.

// self
use crate::{
	_prelude::*,
	auth::{DeviceId, TokenSecret},
};

/// Safety margin subtracted from every `expires_in` so tokens refresh before the server-side
/// expiry.
pub const EXPIRY_MARGIN: Duration = Duration::minutes(5);

/// Computes the local expiry instant for a token issued at `issued_at`.
pub fn expires_on(issued_at: OffsetDateTime, expires_in: Duration) -> OffsetDateTime {
	issued_at + expires_in - EXPIRY_MARGIN
}

/// Principal a session authenticates as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatedAs {
	/// Application id and secret are both known.
	Application,
	/// Anonymous device identity.
	Device,
}
impl AuthenticatedAs {
	/// Derives the principal from the configured identity.
	pub fn from_identity(application_secret: Option<&TokenSecret>) -> Self {
		match application_secret {
			Some(secret) if !secret.is_empty() => Self::Application,
			_ => Self::Device,
		}
	}

	/// Returns the label used in storage keys.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Application => "application",
			Self::Device => "device",
		}
	}
}
impl Display for AuthenticatedAs {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Lifecycle status of the current access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// No access token is held.
	Missing,
	/// Token is present and its local expiry has not passed.
	Active,
	/// Token is present but past its local expiry (or has no expiry at all).
	Expired,
}

/// Token material held by a session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
	/// Bearer token attached to API requests.
	pub access_token: Option<TokenSecret>,
	/// Longer-lived token exchanged for new bearer tokens.
	pub refresh_token: Option<TokenSecret>,
	/// Identity assigned by device registration.
	pub device_id: Option<DeviceId>,
	/// Local expiry of `access_token`, already reduced by [`EXPIRY_MARGIN`].
	pub expires_on: Option<OffsetDateTime>,
}
impl Credentials {
	/// Computes the token status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match (&self.access_token, self.expires_on) {
			(None, _) => TokenStatus::Missing,
			(Some(_), Some(expiry)) if instant <= expiry => TokenStatus::Active,
			(Some(_), _) => TokenStatus::Expired,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if an access token is held, regardless of expiry.
	pub fn has_access_token(&self) -> bool {
		self.access_token.is_some()
	}

	/// Stores a freshly issued access token and its expiry.
	pub fn set_access_token(
		&mut self,
		token: TokenSecret,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) {
		self.access_token = Some(token);
		self.expires_on = Some(expires_on(issued_at, expires_in));
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("device_id", &self.device_id)
			.field("expires_on", &self.expires_on)
			.finish()
	}
}
