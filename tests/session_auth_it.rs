mod support;

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use oauth2_session::{
	auth::{AuthenticatedAs, TokenSecret, TokenStatus},
	error::RequestError,
	events::{EventKind, SessionEvent},
	refresh::{RefreshOutcome, RefreshStrategy},
	request::RequestOptions,
	session::Session,
	store::{PersistenceAdapter, SessionRecord},
};
use support::*;

fn record_events(session: &Session<MockTransport>) -> Arc<Mutex<Vec<SessionEvent>>> {
	let events = Arc::new(Mutex::new(Vec::new()));

	for kind in
		[EventKind::AuthenticationSuccess, EventKind::Authenticated, EventKind::AuthenticationFailure]
	{
		let events = events.clone();

		session.on(kind, Arc::new(move |event: &SessionEvent| events.lock().push(event.clone())));
	}

	events
}

fn kinds(events: &Mutex<Vec<SessionEvent>>) -> Vec<EventKind> {
	events.lock().iter().map(SessionEvent::kind).collect()
}

#[tokio::test]
async fn client_credentials_authenticate_and_persist() {
	let transport = MockTransport::new(|call| match call.path() {
		"/oauth2/token" => Reply::json(token_payload("app-token", None, 3600)),
		_ => Reply::Status(404, "not found".into()),
	});
	let (store, shared) = memory_store();
	let session = session(
		options("app-1").application_secret("s3cret").build().expect("Options should build."),
		shared,
		&transport,
	)
	.await;
	let events = record_events(&session);
	let before = OffsetDateTime::now_utc();
	let outcome = session.refresh().await.expect("Client credentials refresh should succeed.");
	let after = OffsetDateTime::now_utc();

	assert_ne!(outcome, RefreshOutcome::Skipped);

	eventually(|| session.refresh_metrics().coalesced() == 1).await;

	let token_calls = transport.calls_to("/oauth2/token");

	assert_eq!(token_calls.len(), 1);
	assert_eq!(token_calls[0].method, "POST");
	assert_eq!(token_calls[0].form.get("client_id").map(String::as_str), Some("app-1"));
	assert_eq!(token_calls[0].form.get("client_secret").map(String::as_str), Some("s3cret"));
	assert_eq!(
		token_calls[0].form.get("grant_type").map(String::as_str),
		Some("client_credentials")
	);
	assert_eq!(token_calls[0].form.get("f").map(String::as_str), Some("json"));
	assert!(token_calls[0].authorization.is_none());

	let credentials = session.credentials();
	let expires_on = credentials.expires_on.expect("Expiry should be set with the token.");

	assert_eq!(credentials.access_token.as_ref().map(TokenSecret::expose), Some("app-token"));
	assert!(expires_on >= before + Duration::seconds(3300));
	assert!(expires_on <= after + Duration::seconds(3300));
	assert_eq!(session.authenticated_as(), AuthenticatedAs::Application);
	assert_eq!(session.token_status(), TokenStatus::Active);
	assert!(session.authenticated());
	assert_eq!(kinds(&events), vec![EventKind::AuthenticationSuccess, EventKind::Authenticated]);

	let stored = store
		.get(session.store_key())
		.await
		.expect("Store lookup should succeed.")
		.expect("Refresh should persist the session.");

	assert_eq!(session.store_key().as_str(), "_oauth2_session_application_app-1");
	assert_eq!(stored.access_token.as_ref().map(TokenSecret::expose), Some("app-token"));
	assert_eq!(stored.application_secret.as_ref().map(TokenSecret::expose), Some("s3cret"));
	assert_eq!(stored.expires_on, Some(expires_on));
}

#[tokio::test]
async fn refresh_token_rotates_and_survives_omission() {
	let transport = MockTransport::new(|call| {
		match call.form.get("refresh_token").map(String::as_str) {
			Some("r1") => Reply::json(token_payload("a1", Some("r2"), 3600)),
			Some("r2") => Reply::json(token_payload("a2", None, 3600)),
			_ => Reply::Status(400, "unknown refresh token".into()),
		}
	});
	let (_, shared) = memory_store();
	let options = options("app-2")
		.session(SessionRecord { refresh_token: Some(TokenSecret::new("r1")), ..Default::default() })
		.build()
		.expect("Options should build.");
	let session = session(options, shared, &transport).await;

	assert_eq!(session.authenticated_as(), AuthenticatedAs::Device);
	assert_eq!(
		session.refresh().await.expect("First refresh should succeed."),
		RefreshOutcome::Refreshed(RefreshStrategy::RefreshToken)
	);
	assert_eq!(
		session.refresh().await.expect("Second refresh should succeed."),
		RefreshOutcome::Refreshed(RefreshStrategy::RefreshToken)
	);

	eventually(|| session.refresh_metrics().coalesced() == 1).await;

	let credentials = session.credentials();
	let sent = transport
		.calls_to("/oauth2/token")
		.into_iter()
		.map(|call| {
			assert_eq!(call.form.get("grant_type").map(String::as_str), Some("refresh_token"));

			call.form.get("refresh_token").cloned().unwrap_or_default()
		})
		.collect::<Vec<_>>();

	assert_eq!(sent, vec!["r1", "r2"]);
	assert_eq!(credentials.access_token.as_ref().map(TokenSecret::expose), Some("a2"));
	assert_eq!(credentials.refresh_token.as_ref().map(TokenSecret::expose), Some("r2"));
}

#[tokio::test]
async fn device_registration_records_identity() {
	let transport = MockTransport::new(|call| match call.path() {
		"/oauth2/registerDevice" => Reply::json(json!({
			"device": { "deviceId": "dev-1" },
			"deviceToken": {
				"access_token": "device-token",
				"refresh_token": "r1",
				"expires_in": 7200,
			}
		})),
		_ => Reply::Status(404, "not found".into()),
	});
	let (_, shared) = memory_store();
	let session =
		session(options("app-3").build().expect("Options should build."), shared, &transport).await;
	let events = record_events(&session);

	session.refresh().await.expect("Device registration should succeed.");
	eventually(|| session.refresh_metrics().coalesced() == 1).await;

	let registrations = transport.calls_to("/oauth2/registerDevice");
	let credentials = session.credentials();

	assert_eq!(registrations.len(), 1);
	assert_eq!(registrations[0].form.get("client_id").map(String::as_str), Some("app-3"));
	assert!(registrations[0].form.get("grant_type").is_none());
	assert_eq!(credentials.device_id.as_deref(), Some("dev-1"));
	assert_eq!(credentials.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
	assert_eq!(session.store_key().as_str(), "_oauth2_session_device_app-3");

	let events = events.lock();

	match events.as_slice() {
		[SessionEvent::AuthenticationSuccess(first), SessionEvent::Authenticated(second)] => {
			assert_eq!(first, second);
			assert_eq!(first.strategy, RefreshStrategy::DeviceRegistration);
			assert_eq!(first.payload["device"]["deviceId"], "dev-1");
		},
		other => panic!("Unexpected events: {other:?}"),
	}
}

#[tokio::test]
async fn failed_refresh_keeps_requests_queued_and_reports_failure() {
	let transport = MockTransport::new(|_| {
		Reply::json(json!({
			"error": {
				"code": 400,
				"error": "invalid_request",
				"error_description": "Invalid refresh_token",
			}
		}))
	});
	let (_, shared) = memory_store();
	let options = options("app-4")
		.session(SessionRecord { refresh_token: Some(TokenSecret::new("gone")), ..Default::default() })
		.build()
		.expect("Options should build.");
	let session = session(options, shared, &transport).await;
	let events = record_events(&session);
	let pending = session.get("me", RequestOptions::default());
	let error = session.refresh().await.expect_err("Rejected refresh token must fail.");

	assert_eq!(error.kind(), "invalid_request");
	assert!(error.to_string().contains("Invalid refresh_token"));

	// The refresh spawned at construction waited behind this attempt and shares its failure.
	eventually(|| session.refresh_metrics().coalesced() == 1).await;

	assert_eq!(transport.calls_to("/oauth2/token").len(), 1);
	assert_eq!(session.refresh_metrics().failures(), 1);
	assert!(transport.calls_to("/v1/me").is_empty());
	assert_eq!(session.pending_requests(), 1);
	assert!(pending.is_pending());
	assert!(!session.authenticated());
	assert_eq!(kinds(&events), vec![EventKind::AuthenticationFailure]);

	// A later trigger starts a fresh attempt.
	session.refresh().await.expect_err("The refresh token is still rejected.");

	assert_eq!(transport.calls_to("/oauth2/token").len(), 2);
	assert_eq!(
		kinds(&events),
		vec![EventKind::AuthenticationFailure, EventKind::AuthenticationFailure]
	);
}

#[tokio::test]
async fn transport_and_payload_failures_are_classified() {
	let transport = MockTransport::new(|call| {
		match call.form.get("client_secret").map(String::as_str) {
			Some("status") => Reply::Status(500, "upstream unavailable".into()),
			Some("offline") => Reply::Offline,
			Some("garbled") => Reply::Status(200, "<html>".into()),
			_ => Reply::json(json!({ "access_token": "no-expiry" })),
		}
	});
	let cases = [
		("status", "http_error"),
		("offline", "http_error"),
		("garbled", "unexpected_response"),
		("shape", "unexpected_response"),
	];

	for (secret, kind) in cases {
		let (_, shared) = memory_store();
		let session = session(
			options("app-5").application_secret(secret).build().expect("Options should build."),
			shared,
			&transport,
		)
		.await;
		let error = session.refresh().await.expect_err("Broken token responses must fail.");

		assert_eq!(error.kind(), kind, "secret `{secret}` should map to `{kind}`");
		assert!(!session.authenticated());
	}

	let (_, shared) = memory_store();
	let session = session(
		options("app-5").application_secret("status").build().expect("Options should build."),
		shared,
		&transport,
	)
	.await;

	assert!(matches!(
		session.refresh().await,
		Err(RequestError::Http { status: Some(500), .. })
	));
}

#[tokio::test]
async fn no_strategy_skips_without_network_calls() {
	let transport = MockTransport::new(|_| Reply::Status(500, "unreachable".into()));
	let (_, shared) = memory_store();
	let options = options("app-6")
		.auto_register_device(false)
		.build()
		.expect("Options should build without a strategy.");
	let session = session(options, shared, &transport).await;
	let pending = session.get("me", RequestOptions::default());

	assert_eq!(
		session.refresh().await.expect("Skipping is not an error."),
		RefreshOutcome::Skipped
	);

	tokio::task::yield_now().await;

	assert!(transport.calls().is_empty());
	assert!(pending.is_pending());
	assert_eq!(session.pending_requests(), 1);
	assert_eq!(session.refresh_metrics().attempts(), 0);
}
