//! Builds a registry from a JSON configuration and calls an OAuth-protected upstream.
//!
//! The mock server speaks HTTPS with a self-signed certificate, so both clients set `skip_ssl`.
//! Run with `RUST_LOG=outbound_http=debug` to see the structured request/response records.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
// self
use outbound_http::{
	config::Config,
	decode::{Validate, Violations},
	reqwest::Method,
	trace::{RequestContext, TraceId},
};

#[derive(Debug, Deserialize)]
struct Invoice {
	id: String,
	amount: u64,
}
impl Validate for Invoice {
	fn validate(&self, v: &mut Violations) {
		v.required("id", &self.id).min("amount", self.amount, 1);
	}
}

#[derive(Debug, Deserialize)]
struct PartnerError {
	code: String,
	message: String,
}
impl Validate for PartnerError {
	fn validate(&self, v: &mut Violations) {
		v.required("code", &self.code);
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"access_token\":\"demo-access\",\"expires_in\":900}",
			);
		})
		.await;
	let invoice_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/billing/invoices/inv-1")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"inv-1\",\"amount\":4200}");
		})
		.await;
	let raw = format!(
		r#"{{
			"logger": {{ "max_body_length": 256 }},
			"token_clients": [{{ "key": "billing-auth", "basepath": "{token}", "skip_ssl": true }}],
			"token_sources": [{{
				"key": "billing-oauth",
				"client_key": "billing-auth",
				"client_id": "demo-client",
				"client_secret": "super-secret",
				"scopes": ["invoices.read"]
			}}],
			"clients": [{{
				"key": "billing",
				"basepath": "{api}",
				"skip_ssl": true,
				"timeout": 5,
				"token_source_key": "billing-oauth"
			}}]
		}}"#,
		token = server.url("/token"),
		api = server.url("/billing"),
	);
	let config = Config::from_slice(raw.as_bytes())?;

	config.require_clients(["billing"])?;

	let registry = config.into_registry()?;
	let client = registry.client("billing")?;
	let ctx = RequestContext::with_trace_id(TraceId::generate());

	for _ in 0..2 {
		let request = client.build_request(&ctx, Method::GET, "/invoices/inv-1")?;
		let decoded = client.call::<Invoice, PartnerError>(request).await?;

		println!("Classified as {}: {decoded:?}.", decoded.class());
	}

	token_mock.assert_calls_async(1).await;
	invoice_mock.assert_calls_async(2).await;

	Ok(())
}
