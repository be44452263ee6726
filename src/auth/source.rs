//! OAuth 2.0 client-credentials token source with a single-flight token cache.
//!
//! A [`TokenSource`] holds at most one cached [`Token`]. [`TokenSource::token`] takes the
//! per-source guard, returns the cached token while it passes the validity predicate, and
//! otherwise renews it while still holding the guard. Concurrent callers queue on the guard and
//! pick up the token stored by whichever caller renewed first, so one staleness episode costs
//! exactly one token endpoint round-trip. A failed or cancelled renewal leaves the cache as it
//! was; the next caller starts over.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_EXPIRY_DELTA, Token, TokenSecret, TokenState},
	client::Client,
	decode::{self, Decoded, Validate, Violations},
	error::TokenRenewalError,
	obs::{self, CallKind},
	trace::RequestContext,
};

/// Grant requested when the configuration does not name one.
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";
/// Content type of token requests.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Startup description of a token source.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenSourceConfig {
	/// Registry key.
	pub key: String,
	/// Skew margin in seconds; defaults to 60.
	#[serde(default)]
	pub expiry_delta: Option<i64>,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Grant type; defaults to [`DEFAULT_GRANT_TYPE`].
	#[serde(default)]
	pub grant_type: Option<String>,
	/// Requested scopes, sent comma-joined.
	#[serde(default)]
	pub scopes: Vec<String>,
	/// Key of the already registered client that talks to the token endpoint.
	pub client_key: String,
}
impl TokenSourceConfig {
	/// Creates a configuration with default expiry delta, grant type and no scopes.
	pub fn new(
		key: impl Into<String>,
		client_key: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			key: key.into(),
			expiry_delta: None,
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			grant_type: None,
			scopes: Vec::new(),
			client_key: client_key.into(),
		}
	}

	/// Sets the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the expiry delta, in whole seconds.
	pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
		self.expiry_delta = Some(delta.whole_seconds());

		self
	}

	/// Overrides the grant type.
	pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
		self.grant_type = Some(grant_type.into());

		self
	}
}

/// Success body of the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
	/// Token type; a missing value is treated as `Bearer`.
	#[serde(default)]
	pub token_type: String,
	/// Issued access token.
	pub access_token: String,
	/// Lifetime in seconds.
	pub expires_in: i64,
}
impl Validate for TokenResponse {
	fn validate(&self, v: &mut Violations) {
		v.required("access_token", &self.access_token).min("expires_in", self.expires_in, 0);
	}
}

/// RFC 6749 error body of the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenErrorResponse {
	/// Error code, e.g. `invalid_client`.
	pub error: String,
	/// Optional human-readable description.
	#[serde(default)]
	pub error_description: Option<String>,
}
impl Validate for TokenErrorResponse {
	fn validate(&self, v: &mut Violations) {
		v.required("error", &self.error);
	}
}

/// Token provider bound to the client used for renewals.
#[derive(Debug)]
pub struct TokenSource {
	key: String,
	expiry_delta: Duration,
	client_id: String,
	client_secret: TokenSecret,
	grant_type: String,
	scopes: Vec<String>,
	client: Arc<Client>,
	token: AsyncMutex<Option<Arc<Token>>>,
}
impl TokenSource {
	/// Creates an empty token source renewing through `client`.
	pub fn new(config: TokenSourceConfig, client: Arc<Client>) -> Self {
		Self {
			key: config.key,
			expiry_delta: config
				.expiry_delta
				.map(Duration::seconds)
				.unwrap_or(DEFAULT_EXPIRY_DELTA),
			client_id: config.client_id,
			client_secret: config.client_secret,
			grant_type: config.grant_type.unwrap_or_else(|| DEFAULT_GRANT_TYPE.into()),
			scopes: config.scopes,
			client,
			token: AsyncMutex::new(None),
		}
	}

	/// Registry key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Client the token endpoint is called through.
	pub fn client(&self) -> &Arc<Client> {
		&self.client
	}

	/// Skew margin applied to every token this source stores.
	pub fn expiry_delta(&self) -> Duration {
		self.expiry_delta
	}

	/// Grant type sent with renewals.
	pub fn grant_type(&self) -> &str {
		&self.grant_type
	}

	/// Scopes sent with renewals.
	pub fn scopes(&self) -> &[String] {
		&self.scopes
	}

	/// Returns a valid token, renewing the cached one if it is missing or stale.
	///
	/// At most one renewal runs at a time per source. Callers waiting on the guard observe the
	/// token stored by the renewal that ran before them.
	pub async fn token(&self, ctx: &RequestContext) -> Result<Arc<Token>> {
		let mut cached = self.token.lock().await;

		if let Some(token) = cached.as_ref().filter(|token| token.is_valid()) {
			return Ok(Arc::clone(token));
		}

		let token = Arc::new(self.renew(ctx).await?);

		*cached = Some(Arc::clone(&token));

		Ok(token)
	}

	/// Requests a fresh token from the endpoint without touching the cache.
	///
	/// Never retries. Use [`TokenSource::token`] to go through the cache.
	pub async fn renew(&self, ctx: &RequestContext) -> Result<Token> {
		obs::observe(CallKind::TokenRenewal, &self.key, self.request_token(ctx)).await
	}

	async fn request_token(&self, ctx: &RequestContext) -> Result<Token> {
		let endpoint = self.client.basepath();
		let request_failed = |e: Error| TokenRenewalError::Request {
			endpoint: endpoint.to_owned(),
			source: Box::new(e),
		};
		let form = form_urlencoded::Serializer::new(String::new())
			.append_pair("client_id", &self.client_id)
			.append_pair("client_secret", self.client_secret.expose())
			.append_pair("grant_type", &self.grant_type)
			.append_pair("scope", &self.scopes.join(","))
			.finish();
		let request = self
			.client
			.build_raw_request(ctx, Method::POST, "", FORM_CONTENT_TYPE, form.into_bytes())
			.map_err(request_failed)?;
		let response = self.client.execute(request).await.map_err(request_failed)?;
		let issued_at = OffsetDateTime::now_utc();

		match decode::decode_response_or_error::<TokenResponse, TokenErrorResponse>(&response) {
			Decoded::Ok(body) => Ok(Token::builder()
				.token_type(body.token_type)
				.access_token(body.access_token)
				.issued_at(issued_at)
				.expires_in(Duration::seconds(body.expires_in))
				.expiry_delta(self.expiry_delta)
				.build()
				.map_err(TokenRenewalError::from)?),
			Decoded::ExternalError(body) => Err(TokenRenewalError::Rejected {
				error: body.error,
				description: body.error_description,
			}
			.into()),
			Decoded::DecodeError(e) => Err(TokenRenewalError::Decode(e).into()),
			Decoded::ValidationError(e) => Err(TokenRenewalError::Validation(e).into()),
		}
	}

	/// Drops the cached token; the next [`TokenSource::token`] call renews.
	pub async fn invalidate(&self) {
		*self.token.lock().await = None;
	}

	/// Cache state as of now.
	pub async fn state(&self) -> TokenState {
		match self.token.lock().await.as_ref() {
			None => TokenState::Empty,
			Some(token) if token.is_valid() => TokenState::Valid,
			Some(_) => TokenState::Stale,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_defaults_apply() {
		let config: TokenSourceConfig = serde_json::from_str(
			r#"{"key":"partner","client_id":"id","client_secret":"s3cr3t","client_key":"auth"}"#,
		)
		.expect("Minimal token source config should parse.");

		assert_eq!(config.expiry_delta, None);
		assert_eq!(config.grant_type, None);
		assert!(config.scopes.is_empty());
		assert!(!format!("{config:?}").contains("s3cr3t"));
	}

	#[test]
	fn token_response_constraints() {
		let ok = TokenResponse {
			token_type: "Bearer".into(),
			access_token: "abc".into(),
			expires_in: 3600,
		};

		assert!(ok.check().is_ok());

		let bad = TokenResponse {
			token_type: String::new(),
			access_token: String::new(),
			expires_in: -1,
		};
		let err = bad.check().expect_err("Empty token with negative lifetime should fail.");

		assert!(err.has_field("access_token"));
		assert!(err.has_field("expires_in"));
	}

	#[test]
	fn error_response_requires_a_code() {
		let body = TokenErrorResponse { error: " ".into(), error_description: None };

		assert!(body.check().is_err());
	}
}
