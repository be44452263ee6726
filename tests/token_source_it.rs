mod support;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use outbound_http::{
	auth::{TokenSource, TokenSourceConfig, TokenState},
	client::ClientConfig,
	error::{Error, TokenRenewalError},
	registry::Registry,
	trace::RequestContext,
};
use support::ScriptedTransport;

const TOKEN_BODY: &str =
	r#"{"token_type":"Bearer","access_token":"cached-token","expires_in":3600}"#;

fn token_source(server: &MockServer, config: TokenSourceConfig) -> Arc<TokenSource> {
	let mut registry = Registry::default();

	registry
		.register_client(ClientConfig::new("auth", server.url("/token")).with_skip_ssl(true))
		.expect("Token client should register.");
	registry.register_token_source(config).expect("Token source should register.")
}

fn default_config() -> TokenSourceConfig {
	TokenSourceConfig::new("oauth", "auth", "client-id", "s3cr3t").with_scopes(["read", "write"])
}

#[tokio::test]
async fn token_is_cached_until_stale() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body(concat!(
					"client_id=client-id&client_secret=s3cr3t",
					"&grant_type=client_credentials&scope=read%2Cwrite",
				));
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let source = token_source(&server, default_config());

	assert_eq!(source.state().await, TokenState::Empty);

	let first = source.token(&RequestContext::empty()).await.expect("First call should renew.");
	let second =
		source.token(&RequestContext::empty()).await.expect("Second call should hit the cache.");

	mock.assert_calls_async(1).await;

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.access_token.expose(), "cached-token");
	assert_eq!(first.authorization(), "Bearer cached-token");
	assert_eq!(first.expiry_delta, Duration::seconds(60));
	assert_eq!(first.expires_at.map(|at| at - first.issued_at), Some(Duration::seconds(3600)));
	assert_eq!(source.state().await, TokenState::Valid);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_renewal() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(TOKEN_BODY)
				.delay(StdDuration::from_millis(200));
		})
		.await;
	let source = token_source(&server, default_config());
	let handles = (0..16)
		.map(|_| {
			let source = Arc::clone(&source);

			tokio::spawn(async move { source.token(&RequestContext::empty()).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Caller task should not panic.")
			.expect("Every concurrent caller should get a token.");

		assert_eq!(token.access_token.expose(), "cached-token");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_token_is_renewed_once_for_concurrent_callers() {
	let server = MockServer::start_async().await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.body(r#"{"token_type":"Bearer","access_token":"short","expires_in":30}"#);
		})
		.await;
	let source = token_source(&server, default_config());

	source.token(&RequestContext::empty()).await.expect("Cold cache should renew.");

	assert_eq!(source.state().await, TokenState::Stale);

	stale_mock.assert_calls_async(1).await;
	stale_mock.delete_async().await;

	let fresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(TOKEN_BODY)
				.delay(StdDuration::from_millis(200));
		})
		.await;
	let handles = (0..16)
		.map(|_| {
			let source = Arc::clone(&source);

			tokio::spawn(async move { source.token(&RequestContext::empty()).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Caller task should not panic.")
			.expect("Every concurrent caller should get the renewed token.");

		assert_eq!(token.access_token.expose(), "cached-token");
	}

	fresh_mock.assert_calls_async(1).await;

	assert_eq!(source.state().await, TokenState::Valid);
}

#[tokio::test]
async fn stale_tokens_are_renewed_on_every_call() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.body(r#"{"token_type":"Bearer","access_token":"short","expires_in":30}"#);
		})
		.await;
	let source = token_source(&server, default_config());

	source.token(&RequestContext::empty()).await.expect("First call should renew.");

	assert_eq!(source.state().await, TokenState::Stale);

	source.token(&RequestContext::empty()).await.expect("Second call should renew again.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn invalidate_forces_a_renewal() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body(TOKEN_BODY);
		})
		.await;
	let source = token_source(&server, default_config().with_expiry_delta(Duration::seconds(10)));

	source.token(&RequestContext::empty()).await.expect("First call should renew.");
	source.invalidate().await;

	assert_eq!(source.state().await, TokenState::Empty);

	let token = source
		.token(&RequestContext::empty())
		.await
		.expect("Call after invalidate should renew.");

	assert_eq!(token.expiry_delta, Duration::seconds(10));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rejected_renewal_leaves_the_cache_empty() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"unknown client"}"#);
		})
		.await;
	let source = token_source(&server, default_config());

	for _ in 0..2 {
		let err = source
			.token(&RequestContext::empty())
			.await
			.expect_err("Rejected renewal should surface to the caller.");

		assert!(matches!(
			err,
			Error::TokenRenewal(TokenRenewalError::Rejected { ref error, ref description })
				if error == "invalid_client" && description.as_deref() == Some("unknown client")
		));
	}

	assert_eq!(source.state().await, TokenState::Empty);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unusable_bodies_are_classified() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("<html>gateway</html>");
		})
		.await;

	let err = token_source(&server, default_config())
		.token(&RequestContext::empty())
		.await
		.expect_err("Non-JSON body should fail renewal.");

	assert!(matches!(err, Error::TokenRenewal(TokenRenewalError::Decode(_))));

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.body(r#"{"token_type":"Bearer","access_token":"","expires_in":60}"#);
		})
		.await;

	let err = token_source(&server, default_config())
		.token(&RequestContext::empty())
		.await
		.expect_err("Empty access token should fail renewal.");

	assert!(matches!(
		err,
		Error::TokenRenewal(TokenRenewalError::Validation(ref violations))
			if violations.has_field("access_token")
	));
}

#[tokio::test]
async fn cancelled_renewal_changes_nothing() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body(TOKEN_BODY).delay(StdDuration::from_millis(1500));
		})
		.await;

	let source = token_source(&server, default_config());
	let cancelled =
		tokio::time::timeout(StdDuration::from_millis(200), source.token(&RequestContext::empty()))
			.await;

	assert!(cancelled.is_err());
	assert_eq!(source.state().await, TokenState::Empty);

	let token = source
		.token(&RequestContext::empty())
		.await
		.expect("Next caller should renew from scratch.");

	assert_eq!(token.access_token.expose(), "cached-token");
	assert_eq!(source.state().await, TokenState::Valid);
}

#[tokio::test]
async fn transport_failures_are_wrapped() {
	let mut registry = Registry::default();
	let transport = Arc::new(ScriptedTransport::failing());

	registry
		.register_client(
			ClientConfig::new("auth", "http://auth.local/token").with_transport(transport.clone()),
		)
		.expect("Token client should register.");

	let source = registry
		.register_token_source(default_config())
		.expect("Token source should register.");
	let err = source
		.token(&RequestContext::empty())
		.await
		.expect_err("Transport failure should fail renewal.");

	assert!(matches!(
		err,
		Error::TokenRenewal(TokenRenewalError::Request { ref endpoint, .. })
			if endpoint == "http://auth.local/token"
	));
	assert_eq!(transport.calls(), 1);
	assert_eq!(transport.last().method, "POST");
}
