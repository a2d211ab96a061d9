//! Scripted in-process transport shared by the session integration tests.

#![allow(dead_code)]

// std
use std::{collections::BTreeMap, io, sync::Arc, time::Duration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::{task, time};
// self
use oauth2_session::{
	auth::ApplicationId,
	http::TransportClient,
	session::{Session, SessionOptions, SessionOptionsBuilder},
	store::{MemoryStore, PersistenceAdapter},
	url::{Url, form_urlencoded},
};

pub const BASE_URL: &str = "https://api.example.com/v1/";
pub const TOKEN_URL: &str = "https://auth.example.com/oauth2/token";
pub const REGISTER_URL: &str = "https://auth.example.com/oauth2/registerDevice";

/// One request observed by [`MockTransport`].
#[derive(Clone, Debug)]
pub struct Recorded {
	pub method: String,
	pub url: Url,
	pub authorization: Option<String>,
	pub form: BTreeMap<String, String>,
}
impl Recorded {
	pub fn path(&self) -> &str {
		self.url.path()
	}

	pub fn query(&self, key: &str) -> Option<String> {
		self.url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
	}

	pub fn bearer(&self) -> Option<&str> {
		self.authorization.as_deref().and_then(|value| value.strip_prefix("Bearer "))
	}
}

/// Scripted reply: status code plus body, or a transport failure.
#[derive(Clone, Debug)]
pub enum Reply {
	Status(u16, String),
	Offline,
}
impl Reply {
	pub fn json(value: Value) -> Self {
		Self::Status(200, value.to_string())
	}
}

type Responder = dyn Fn(&Recorded) -> Reply + Send + Sync;

struct MockInner {
	responder: Box<Responder>,
	calls: Mutex<Vec<Recorded>>,
}

/// Transport that answers every request through a responder closure and records the calls.
#[derive(Clone)]
pub struct MockTransport(Arc<MockInner>);
impl MockTransport {
	pub fn new<F>(responder: F) -> Self
	where
		F: 'static + Fn(&Recorded) -> Reply + Send + Sync,
	{
		Self(Arc::new(MockInner { responder: Box::new(responder), calls: Mutex::new(Vec::new()) }))
	}

	pub fn calls(&self) -> Vec<Recorded> {
		self.0.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<Recorded> {
		self.calls().into_iter().filter(|call| call.path() == path).collect()
	}
}
impl TransportClient for MockTransport {
	type Handle = MockHandle;
	type TransportError = io::Error;

	fn handle(&self) -> Self::Handle {
		MockHandle(self.0.clone())
	}
}

pub struct MockHandle(Arc<MockInner>);
impl<'c> AsyncHttpClient<'c> for MockHandle {
	type Error = HttpClientError<io::Error>;
	type Future = std::pin::Pin<
		Box<dyn std::future::Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>,
	>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let recorded = Recorded {
			method: request.method().to_string(),
			url: Url::parse(&request.uri().to_string()).expect("Request URI should be a URL."),
			authorization: request
				.headers()
				.get("authorization")
				.map(|value| value.to_str().expect("Header should be ASCII.").to_owned()),
			form: form_urlencoded::parse(request.body()).into_owned().collect(),
		};
		let reply = (self.0.responder)(&recorded);

		self.0.calls.lock().push(recorded);

		Box::pin(async move {
			match reply {
				Reply::Status(status, body) => {
					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					Ok(response)
				},
				Reply::Offline => Err(HttpClientError::Other("connection refused".into())),
			}
		})
	}
}

pub fn token_payload(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> Value {
	match refresh_token {
		Some(refresh_token) => json!({
			"access_token": access_token,
			"refresh_token": refresh_token,
			"expires_in": expires_in,
		}),
		None => json!({ "access_token": access_token, "expires_in": expires_in }),
	}
}

pub fn token_rejected() -> Reply {
	Reply::json(json!({
		"error": {
			"type": "invalidHeader",
			"message": "Token expired or invalid.",
			"headers": { "Authorization": true },
		}
	}))
}

pub fn options(application_id: &str) -> SessionOptionsBuilder {
	SessionOptions::builder(
		ApplicationId::new(application_id).expect("Application fixture should be valid."),
	)
	.base_url(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
	.token_url(Url::parse(TOKEN_URL).expect("Token URL fixture should parse."))
	.register_url(Url::parse(REGISTER_URL).expect("Register URL fixture should parse."))
}

pub async fn session(
	options: SessionOptions,
	store: Arc<dyn PersistenceAdapter>,
	transport: &MockTransport,
) -> Session<MockTransport> {
	Session::with_http_client(options, store, transport.clone())
		.await
		.expect("Session should build with the mock transport.")
}

pub fn memory_store() -> (MemoryStore, Arc<dyn PersistenceAdapter>) {
	let store = MemoryStore::default();
	let shared: Arc<dyn PersistenceAdapter> = Arc::new(store.clone());

	(store, shared)
}

/// Yields to spawned session tasks until `check` holds.
pub async fn eventually<F>(mut check: F)
where
	F: FnMut() -> bool,
{
	time::timeout(Duration::from_secs(5), async {
		while !check() {
			task::yield_now().await;
		}
	})
	.await
	.expect("Condition should hold before the timeout.");
}
