//! Demonstrates a confidential-application session on the default reqwest transport: the first
//! API call is queued, the session authenticates with client credentials, and the queued call is
//! replayed with the new bearer token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_session::{
	auth::ApplicationId,
	events::{EventKind, SessionEvent},
	request::RequestOptions,
	session::{ReqwestSession, SessionOptions},
	store::{MemoryStore, PersistenceAdapter},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/portals/self").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"name\":\"Demo Portal\",\"id\":\"p-1\"}");
		})
		.await;
	let options = SessionOptions::builder(ApplicationId::new("demo-client")?)
		.application_secret("super-secret")
		.base_url(Url::parse(&server.url("/api"))?)
		.token_url(Url::parse(&server.url("/oauth2/token"))?)
		.build()?;
	let store = <Arc<MemoryStore>>::default();
	let session = ReqwestSession::new(options, store.clone() as Arc<dyn PersistenceAdapter>).await?;

	session.on(
		EventKind::Authenticated,
		Arc::new(|event: &SessionEvent| {
			if let SessionEvent::Authenticated(response) = event {
				println!("Authenticated with {}.", response.strategy);
			}
		}),
	);

	let portal = session.get("portals/self", RequestOptions::default()).await?;

	println!("Portal payload: {}.", portal.payload().cloned().unwrap_or_default());
	println!("Persisted records: {}.", store.len());

	token_mock.assert_async().await;
	api_mock.assert_async().await;

	Ok(())
}
