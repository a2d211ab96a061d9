//! Demonstrates plugging a custom [`TransportClient`] into a session.
//!
//! The in-process transport registers an anonymous device, rejects the device's first bearer
//! token once, and shows the session refreshing with the issued refresh token and retrying the
//! rejected call without surfacing an error.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use color_eyre::Result;
// self
use oauth2_session::{
	auth::ApplicationId,
	http::TransportClient,
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	request::RequestOptions,
	session::{Session, SessionOptions},
	store::{MemoryStore, PersistenceAdapter},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let options = SessionOptions::builder(ApplicationId::new("demo-device-app")?)
		.base_url(Url::parse("https://api.example.com/v1")?)
		.token_url(Url::parse("https://auth.example.com/oauth2/token")?)
		.register_url(Url::parse("https://auth.example.com/oauth2/registerDevice")?)
		.build()?;
	let store: Arc<dyn PersistenceAdapter> = Arc::new(MemoryStore::default());
	let session: Session<DemoTransport> =
		Session::with_http_client(options, store, DemoTransport::default()).await?;
	let profile = session.get("self", RequestOptions::default()).await?;

	println!("Profile payload: {}.", profile.payload().cloned().unwrap_or_default());
	println!(
		"Device {:?} made {} token calls.",
		session.credentials().device_id,
		session.refresh_metrics().attempts(),
	);

	let offline: Session<DemoTransport> = Session::with_http_client(
		SessionOptions::builder(ApplicationId::new("demo-offline-app")?)
			.application_secret("demo-secret")
			.base_url(Url::parse("https://api.example.com/v1")?)
			.token_url(Url::parse("https://auth.example.com/oauth2/token")?)
			.build()?,
		Arc::new(MemoryStore::default()) as Arc<dyn PersistenceAdapter>,
		DemoTransport::offline(),
	)
	.await?;

	match offline.refresh().await {
		Ok(outcome) => println!("Offline transport unexpectedly refreshed: {outcome:?}."),
		Err(e) => println!("Transport failure surfaced as `{}`: {e}", e.kind()),
	}

	Ok(())
}

#[derive(Debug)]
struct DemoTransportError {
	host: String,
}
impl Display for DemoTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "DNS lookup failed for {}", self.host)
	}
}
impl StdError for DemoTransportError {}

#[derive(Default)]
struct DemoState {
	offline: bool,
	rejected_once: AtomicBool,
}

#[derive(Clone, Default)]
struct DemoTransport(Arc<DemoState>);
impl DemoTransport {
	fn offline() -> Self {
		Self(Arc::new(DemoState { offline: true, ..Default::default() }))
	}
}
impl TransportClient for DemoTransport {
	type Handle = DemoHandle;
	type TransportError = DemoTransportError;

	fn handle(&self) -> Self::Handle {
		DemoHandle(self.0.clone())
	}
}

struct DemoHandle(Arc<DemoState>);
impl DemoHandle {
	fn respond(&self, request: &HttpRequest) -> Result<&'static str, DemoTransportError> {
		if self.0.offline {
			return Err(DemoTransportError {
				host: request.uri().host().unwrap_or_default().to_owned(),
			});
		}

		let bearer = request
			.headers()
			.get("authorization")
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default();

		Ok(match request.uri().path() {
			"/oauth2/registerDevice" =>
				r#"{"device":{"deviceId":"demo-device"},"deviceToken":{"access_token":"first","refresh_token":"demo-refresh","expires_in":1800}}"#,
			"/oauth2/token" => r#"{"access_token":"second","expires_in":1800}"#,
			_ if bearer == "Bearer first" && !self.0.rejected_once.swap(true, Ordering::SeqCst) =>
				r#"{"error":{"code":498,"type":"invalidHeader","message":"Token expired","headers":{"Authorization":true}}}"#,
			_ => r#"{"name":"Demo Device User"}"#,
		})
	}
}
impl<'c> AsyncHttpClient<'c> for DemoHandle {
	type Error = HttpClientError<DemoTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let outcome = self.respond(&request);

		Box::pin(async move {
			match outcome {
				Ok(body) => Ok(HttpResponse::new(body.as_bytes().to_vec())),
				// The oauth2 crate keeps the `Reqwest` variant name for any boxed transport error.
				Err(e) => Err(HttpClientError::Reqwest(Box::new(e))),
			}
		})
	}
}
