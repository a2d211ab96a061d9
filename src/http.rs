//! Transport primitives for session requests and token exchanges.
//!
//! The session never talks to an HTTP stack directly. It asks a [`TransportClient`] for a
//! short-lived [`AsyncHttpClient`] handle and executes plain [`HttpRequest`]s through it, so any
//! client that speaks the `oauth2` crate's transport contract can be injected. The default
//! `reqwest` feature ships [`ReqwestHttpClient`].

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::RequestError};

/// Abstraction over HTTP transports able to execute session requests.
///
/// Implementations must be `Send + Sync + 'static` because a session shares one transport
/// between every spawned request task. The handles they return must own whatever state they
/// need so their request futures stay `Send` while in flight.
pub trait TransportClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single request.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle ready to execute one request.
	fn handle(&self) -> Self::Handle;
}

/// Executes `request` through `client`, mapping transport failures to `http_error`.
pub(crate) async fn execute<C>(
	client: &C,
	request: HttpRequest,
) -> Result<HttpResponse, RequestError>
where
	C: ?Sized + TransportClient,
{
	let handle = client.handle();

	handle.call(request).await.map_err(map_transport_error)
}

fn map_transport_error<E>(error: HttpClientError<E>) -> RequestError
where
	E: 'static + Send + Sync + StdError,
{
	let message = match &error {
		HttpClientError::Reqwest(inner) => inner.to_string(),
		other => other.to_string(),
	};

	RequestError::Http { status: None, message }
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly instead of redirecting, so a custom [`ReqwestClient`]
/// should keep redirect following disabled.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled.
	pub fn without_redirects() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}
#[cfg(feature = "reqwest")]
impl TransportClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TransportClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;

	#[test]
	fn transport_failures_map_to_http_errors() {
		let error =
			map_transport_error(HttpClientError::<io::Error>::Other("connection reset".into()));

		assert_eq!(error.kind(), "http_error");
		assert!(matches!(
			error,
			RequestError::Http { status: None, ref message } if message.contains("connection reset")
		));
	}
}
