//! Session-level error types shared across dispatch, refresh, and persistence.

// self
use crate::{_prelude::*, auth::IdentifierError, store::StoreError};

/// Session-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the session's fallible, non-request APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem; construction cannot complete.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Misuse of a one-shot primitive.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Request or credential acquisition failure.
	#[error(transparent)]
	Request(#[from] RequestError),
}

/// Configuration and validation failures raised while building a session.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// An identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// A required endpoint was not configured.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// The session was created outside of a Tokio runtime.
	#[error("Sessions must be created from within a Tokio runtime.")]
	MissingRuntime,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Programming errors around one-shot completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum ProtocolError {
	/// `resolve` or `reject` was called on a deferred that already settled.
	#[error("Deferred already completed.")]
	AlreadyCompleted,
}

/// Failure delivered to a request's deferred or to `authentication:failure` listeners.
///
/// The type is `Clone` because a single outcome fans out to every subscriber.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum RequestError {
	/// Non-2xx status or network failure (`http_error`).
	#[error("HTTP request failed: {message}.")]
	Http {
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Response body or transport failure description.
		message: String,
	},
	/// Payload was not JSON or did not match the expected shape (`unexpected_response`).
	#[error("API returned a non-JSON or unexpected payload: {message}.")]
	UnexpectedResponse {
		/// What could not be decoded.
		message: String,
	},
	/// The request could not be turned into an HTTP call (bad URL, bad header value).
	#[error("Request could not be built: {message}.")]
	InvalidRequest {
		/// Builder failure description.
		message: String,
	},
	/// API-level error payload.
	#[error(transparent)]
	Api(#[from] ApiError),
}
impl RequestError {
	/// Returns the wire-level error kind label.
	pub fn kind(&self) -> &str {
		match self {
			Self::Http { .. } => "http_error",
			Self::UnexpectedResponse { .. } => "unexpected_response",
			Self::InvalidRequest { .. } => "invalid_request",
			Self::Api(api) => &api.kind,
		}
	}

	pub(crate) fn unexpected(message: impl Into<String>) -> Self {
		Self::UnexpectedResponse { message: message.into() }
	}
}

/// Error object returned by the API (or token endpoint) under the `error` key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ThisError)]
#[error("API returned `{kind}`: {message}.")]
pub struct ApiError {
	/// Error type, e.g. `invalidHeader`.
	#[serde(rename = "type", default)]
	pub kind: String,
	/// Human-readable message.
	#[serde(default)]
	pub message: String,
	/// Offending request headers, as reported by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub headers: Option<serde_json::Map<String, Value>>,
	/// Any other fields the API included.
	#[serde(flatten)]
	pub detail: serde_json::Map<String, Value>,
}
impl ApiError {
	const TOKEN_REJECTED_KIND: &str = "invalidHeader";

	/// Decodes the value found under a payload's `error` key.
	///
	/// Token endpoints report `error`/`error_description` instead of `type`/`message`; those are
	/// used as fallbacks. A bare string becomes the kind.
	pub fn from_value(value: &Value) -> Self {
		if let Value::String(kind) = value {
			return Self {
				kind: kind.clone(),
				message: String::new(),
				headers: None,
				detail: Default::default(),
			};
		}

		let mut api = serde_json::from_value::<Self>(value.clone()).unwrap_or_else(|_| Self {
			kind: String::new(),
			message: value.to_string(),
			headers: None,
			detail: Default::default(),
		});

		if api.kind.is_empty() {
			api.kind = detail_string(&api.detail, "error").unwrap_or_default();
		}
		if api.message.is_empty() {
			api.message = detail_string(&api.detail, "error_description").unwrap_or_default();
		}

		api
	}

	/// Returns `true` when the API rejected the bearer token carried by the request.
	pub fn is_token_rejected(&self) -> bool {
		self.kind == Self::TOKEN_REJECTED_KIND
			&& self
				.headers
				.as_ref()
				.and_then(|headers| headers.get("Authorization"))
				.is_some_and(is_truthy)
	}
}

fn detail_string(detail: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
	detail.get(key).and_then(Value::as_str).map(str::to_owned)
}

pub(crate) fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
		Value::String(text) => !text.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}
