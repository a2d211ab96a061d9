//! Credential strategies: selection, request forms, and response decoding.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, DeviceId, TokenSecret},
	error::RequestError,
	request::{HttpVerb, RequestSpec},
	session::SessionOptions,
};

/// Way a session obtains a new access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
	/// `grant_type=client_credentials` with the application secret.
	ClientCredentials,
	/// `grant_type=refresh_token` with the stored refresh token.
	RefreshToken,
	/// Anonymous device registration.
	DeviceRegistration,
}
impl RefreshStrategy {
	/// Picks the first applicable strategy: secret, then refresh token, then registration.
	pub fn select(has_secret: bool, has_refresh_token: bool, auto_register: bool) -> Option<Self> {
		if has_secret {
			Some(Self::ClientCredentials)
		} else if has_refresh_token {
			Some(Self::RefreshToken)
		} else if auto_register {
			Some(Self::DeviceRegistration)
		} else {
			None
		}
	}

	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ClientCredentials => "client_credentials",
			Self::RefreshToken => "refresh_token",
			Self::DeviceRegistration => "device_registration",
		}
	}

	/// Builds the form POST this strategy sends.
	pub(crate) fn request_spec(
		self,
		options: &SessionOptions,
		application_secret: Option<&TokenSecret>,
		refresh_token: Option<&TokenSecret>,
	) -> Result<RequestSpec, RequestError> {
		let (url, extra): (&Url, Vec<(&str, &str)>) = match self {
			Self::ClientCredentials => {
				let secret = application_secret.ok_or_else(|| missing("application secret"))?;

				(
					&options.token_url,
					vec![("client_secret", secret.expose()), ("grant_type", "client_credentials")],
				)
			},
			Self::RefreshToken => {
				let token = refresh_token.ok_or_else(|| missing("refresh token"))?;

				(
					&options.token_url,
					vec![("refresh_token", token.expose()), ("grant_type", "refresh_token")],
				)
			},
			Self::DeviceRegistration => (
				options.register_url.as_ref().ok_or_else(|| missing("registration endpoint"))?,
				Vec::new(),
			),
		};
		let mut spec = RequestSpec::new(HttpVerb::Post, url.as_str());

		spec.params.insert("client_id".into(), options.application_id.to_string());
		spec.params.insert("f".into(), "json".into());
		spec.params.extend(extra.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())));

		Ok(spec)
	}

	/// Decodes the endpoint payload for this strategy.
	pub(crate) fn parse_grant(self, payload: &Value) -> Result<Grant, RequestError> {
		match self {
			Self::ClientCredentials | Self::RefreshToken =>
				decode::<TokenResponse>(payload)?.into_grant(None),
			Self::DeviceRegistration => {
				let registration = decode::<DeviceRegistration>(payload)?;

				registration.device_token.into_grant(Some(registration.device.device_id))
			},
		}
	}
}
impl Display for RefreshStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token material decoded from a successful strategy response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Grant {
	pub(crate) access_token: TokenSecret,
	pub(crate) refresh_token: Option<TokenSecret>,
	pub(crate) device_id: Option<DeviceId>,
	pub(crate) expires_in: Duration,
}
impl Grant {
	/// Writes the grant into `credentials`.
	///
	/// Fields the response did not carry keep their current value, so a refresh-token response
	/// without a new refresh token keeps the old one.
	pub(crate) fn apply(self, credentials: &mut Credentials, issued_at: OffsetDateTime) {
		credentials.set_access_token(self.access_token, issued_at, self.expires_in);

		if let Some(refresh_token) = self.refresh_token {
			credentials.refresh_token = Some(refresh_token);
		}
		if let Some(device_id) = self.device_id {
			credentials.device_id = Some(device_id);
		}
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
	expires_in: i64,
}
impl TokenResponse {
	fn into_grant(self, device_id: Option<DeviceId>) -> Result<Grant, RequestError> {
		if self.access_token.is_empty() {
			return Err(RequestError::unexpected("token payload carried an empty access_token"));
		}

		Ok(Grant {
			access_token: self.access_token,
			refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
			device_id,
			expires_in: positive_expiry(self.expires_in)?,
		})
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRegistration {
	device: RegisteredDevice,
	device_token: TokenResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredDevice {
	device_id: DeviceId,
}

fn missing(what: &str) -> RequestError {
	RequestError::InvalidRequest { message: format!("no {what} is configured") }
}

fn decode<T>(payload: &Value) -> Result<T, RequestError>
where
	T: for<'de> Deserialize<'de>,
{
	serde_path_to_error::deserialize(payload).map_err(|e| {
		RequestError::unexpected(format!("invalid token payload at `{}`: {}", e.path(), e.inner()))
	})
}

fn positive_expiry(expires_in: i64) -> Result<Duration, RequestError> {
	if expires_in <= 0 {
		return Err(RequestError::unexpected(format!(
			"token payload carried a non-positive expires_in ({expires_in})"
		)));
	}

	Ok(Duration::seconds(expires_in))
}
