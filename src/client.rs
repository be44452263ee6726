//! Named upstream clients: basepath, timeout, request defaults and an assembled transport chain.

// self
use crate::{
	_prelude::*,
	auth::TokenSource,
	decode::{self, Decoded, Validate},
	error::{ConfigError, TransportError},
	obs::{self, CallKind, LogConfig},
	trace::RequestContext,
	transport::{self, HttpRequest, HttpResponse, RequestTimeout, Transport},
};

/// Per-request timeout applied when a configuration omits one.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Content type of JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Startup description of a client.
#[derive(Clone, Default, Deserialize)]
pub struct ClientConfig {
	/// Registry key.
	pub key: String,
	/// Prefix prepended to every request path.
	pub basepath: String,
	/// Replacement for the default base transport; never read from configuration files.
	#[serde(skip)]
	pub transport: Option<Arc<dyn Transport>>,
	/// Per-request timeout in seconds; defaults to [`DEFAULT_TIMEOUT`], `0` disables it.
	#[serde(default)]
	pub timeout: Option<u64>,
	/// Headers sent with every request.
	#[serde(default)]
	pub default_headers: BTreeMap<String, Vec<String>>,
	/// Query parameters appended to every request.
	#[serde(default)]
	pub default_params: BTreeMap<String, Vec<String>>,
	/// Accept any TLS certificate presented by the upstream.
	#[serde(default)]
	pub skip_ssl: bool,
	/// Key of the token source authenticating this client's requests.
	#[serde(default)]
	pub token_source_key: Option<String>,
}
impl ClientConfig {
	/// Creates a configuration with no defaults, no authentication and the default timeout.
	pub fn new(key: impl Into<String>, basepath: impl Into<String>) -> Self {
		Self { key: key.into(), basepath: basepath.into(), ..Default::default() }
	}

	/// Sets the per-request timeout in whole seconds; `0` disables the deadline.
	pub fn with_timeout(mut self, secs: u64) -> Self {
		self.timeout = Some(secs);

		self
	}

	/// Adds one value of a default header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.entry(name.into()).or_default().push(value.into());

		self
	}

	/// Adds one value of a default query parameter.
	pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_params.entry(name.into()).or_default().push(value.into());

		self
	}

	/// Authenticates requests with the token source registered under `key`.
	pub fn with_token_source(mut self, key: impl Into<String>) -> Self {
		self.token_source_key = Some(key.into());

		self
	}

	/// Replaces the default base transport.
	pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Toggles TLS verification off.
	pub fn with_skip_ssl(mut self, skip_ssl: bool) -> Self {
		self.skip_ssl = skip_ssl;

		self
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("key", &self.key)
			.field("basepath", &self.basepath)
			.field("transport", &self.transport.as_ref().map(|_| "custom"))
			.field("timeout", &self.timeout)
			.field("default_headers", &self.default_headers)
			.field("default_params", &self.default_params)
			.field("skip_ssl", &self.skip_ssl)
			.field("token_source_key", &self.token_source_key)
			.finish()
	}
}

/// Configured call target.
///
/// Immutable once built; re-registering a key builds a new `Client` and swaps it in whole.
pub struct Client {
	key: String,
	basepath: String,
	timeout: Option<StdDuration>,
	default_headers: HeaderMap,
	default_params: Vec<(String, String)>,
	token_source: Option<Arc<TokenSource>>,
	transport: Arc<dyn Transport>,
}
impl Client {
	/// Builds a client and its transport chain.
	///
	/// `token_source` must already be resolved from `config.token_source_key`.
	pub fn new(
		config: ClientConfig,
		token_source: Option<Arc<TokenSource>>,
		log: Arc<LogConfig>,
	) -> Result<Self, ConfigError> {
		let default_headers = header_map(&config.default_headers)?;
		let default_params = config
			.default_params
			.into_iter()
			.flat_map(|(name, values)| values.into_iter().map(move |value| (name.clone(), value)))
			.collect();
		let transport = transport::assemble_transport(
			config.skip_ssl,
			config.transport,
			token_source.clone(),
			log,
		)?;

		Ok(Self {
			key: config.key,
			basepath: config.basepath,
			timeout: match config.timeout {
				None => Some(DEFAULT_TIMEOUT),
				Some(0) => None,
				Some(secs) => Some(StdDuration::from_secs(secs)),
			},
			default_headers,
			default_params,
			token_source,
			transport,
		})
	}

	/// Registry key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Prefix prepended to every request path.
	pub fn basepath(&self) -> &str {
		&self.basepath
	}

	/// Deadline for one call through the whole chain, token renewal included; `None` when
	/// disabled.
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout
	}

	/// Headers sent with every request.
	pub fn default_headers(&self) -> &HeaderMap {
		&self.default_headers
	}

	/// Query parameters appended to every request, in configuration order.
	pub fn default_params(&self) -> &[(String, String)] {
		&self.default_params
	}

	/// Token source authenticating this client, if any.
	pub fn token_source(&self) -> Option<&Arc<TokenSource>> {
		self.token_source.as_ref()
	}

	/// Outermost layer of the assembled chain.
	pub fn transport(&self) -> &Arc<dyn Transport> {
		&self.transport
	}

	/// Builds a body-less request to `basepath + path`.
	pub fn build_request(
		&self,
		ctx: &RequestContext,
		method: Method,
		path: &str,
	) -> Result<HttpRequest> {
		self.assemble(ctx, method, path, None)
	}

	/// Builds a request to `basepath + path` carrying `body` serialized as JSON.
	pub fn build_json_request<B>(
		&self,
		ctx: &RequestContext,
		method: Method,
		path: &str,
		body: &B,
	) -> Result<HttpRequest>
	where
		B: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(body).map_err(Error::Serialization)?;

		self.assemble(ctx, method, path, Some((JSON_CONTENT_TYPE, body)))
	}

	/// Builds a request to `basepath + path` carrying an already encoded body.
	pub fn build_raw_request(
		&self,
		ctx: &RequestContext,
		method: Method,
		path: &str,
		content_type: &str,
		body: Vec<u8>,
	) -> Result<HttpRequest> {
		self.assemble(ctx, method, path, Some((content_type, body)))
	}

	/// Sends `request` through this client's chain.
	///
	/// The client's timeout bounds the whole chain, whatever base transport it ends in. An
	/// elapsed deadline drops the in-flight call and fails with [`TransportError::Timeout`].
	pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		obs::observe(CallKind::ClientCall, &self.key, self.execute_within_deadline(request)).await
	}

	/// Sends `request` and classifies the body against the success schema `T` and the error
	/// schema `E`.
	///
	/// Only failures to obtain a response are returned as `Err`; every body is classified.
	pub async fn call<T, E>(&self, request: HttpRequest) -> Result<Decoded<T, E>>
	where
		T: DeserializeOwned + Validate,
		E: DeserializeOwned + Validate,
	{
		let response = self.execute(request).await?;

		Ok(decode::decode_response_or_error(&response))
	}

	async fn execute_within_deadline(&self, request: HttpRequest) -> Result<HttpResponse> {
		let call = self.transport.execute(request);
		let Some(timeout) = self.timeout else {
			return call.await;
		};

		tokio::time::timeout(timeout, call)
			.await
			.map_err(|_| TransportError::Timeout { timeout })?
	}

	fn assemble(
		&self,
		ctx: &RequestContext,
		method: Method,
		path: &str,
		body: Option<(&str, Vec<u8>)>,
	) -> Result<HttpRequest> {
		let raw = format!("{}{path}", self.basepath);
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidUrl { url: raw.clone(), source })?;

		if !self.default_params.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.default_params);
		}

		let (content_type, body) = match body {
			Some((content_type, body)) => (Some(content_type), body),
			None => (None, Vec::new()),
		};
		let mut request = http::Request::builder()
			.method(method)
			.uri(url.as_str())
			.body(body)
			.map_err(ConfigError::from)?;
		let headers = request.headers_mut();

		for (name, value) in &self.default_headers {
			headers.append(name, value.clone());
		}
		if let Some(content_type) = content_type {
			let value = HeaderValue::from_str(content_type).map_err(|_| ConfigError::InvalidHeader {
				name: http::header::CONTENT_TYPE.to_string(),
			})?;

			headers.insert(http::header::CONTENT_TYPE, value);
		}

		let extensions = request.extensions_mut();

		extensions.insert(ctx.clone());

		if let Some(timeout) = self.timeout {
			extensions.insert(RequestTimeout(timeout));
		}

		Ok(request)
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("key", &self.key)
			.field("basepath", &self.basepath)
			.field("timeout", &self.timeout)
			.field("default_headers", &self.default_headers)
			.field("default_params", &self.default_params)
			.field("token_source", &self.token_source.as_ref().map(|source| source.key()))
			.finish_non_exhaustive()
	}
}

fn header_map(headers: &BTreeMap<String, Vec<String>>) -> Result<HeaderMap, ConfigError> {
	let mut map = HeaderMap::new();

	for (name, values) in headers {
		let invalid = || ConfigError::InvalidHeader { name: name.clone() };
		let header = HeaderName::from_str(name).map_err(|_| invalid())?;

		for value in values {
			map.append(header.clone(), HeaderValue::from_str(value).map_err(|_| invalid())?);
		}
	}

	Ok(map)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::trace::{TRACE_ID_HEADER, TraceId};

	fn client(config: ClientConfig) -> Client {
		Client::new(config, None, Arc::new(LogConfig::default()))
			.expect("Client fixture should build.")
	}

	#[test]
	fn config_parses_with_defaults() {
		let config: ClientConfig =
			serde_json::from_str(r#"{"key":"users","basepath":"https://api.example.com"}"#)
				.expect("Minimal client config should parse.");
		let client = client(config);

		assert_eq!(client.key(), "users");
		assert_eq!(client.timeout(), Some(DEFAULT_TIMEOUT));
		assert!(client.default_headers().is_empty());
		assert!(client.token_source().is_none());
	}

	#[test]
	fn json_request_carries_defaults_and_context() {
		let client = client(
			ClientConfig::new("users", "https://api.example.com/v1")
				.with_timeout(5)
				.with_header("x-api-key", "k1")
				.with_header("x-api-key", "k2")
				.with_param("lang", "en"),
		);
		let ctx = RequestContext::with_trace_id(TraceId::new("t-9"));
		let request = client
			.build_json_request(&ctx, Method::POST, "/users?page=2", &serde_json::json!({ "a": 1 }))
			.expect("JSON request should build.");

		assert_eq!(request.uri(), "https://api.example.com/v1/users?page=2&lang=en");
		assert_eq!(request.headers()[http::header::CONTENT_TYPE], JSON_CONTENT_TYPE);
		assert_eq!(request.headers().get_all("x-api-key").iter().count(), 2);
		assert!(request.headers().get(TRACE_ID_HEADER).is_none());
		assert_eq!(request.body(), br#"{"a":1}"#);
		assert_eq!(RequestContext::of(&request), ctx);
		assert_eq!(
			request.extensions().get::<RequestTimeout>(),
			Some(&RequestTimeout(StdDuration::from_secs(5)))
		);
	}

	#[test]
	fn bodyless_request_has_no_content_type() {
		let client = client(ClientConfig::new("users", "http://svc.local"));
		let request = client
			.build_request(&RequestContext::empty(), Method::GET, "/users/1")
			.expect("Request should build.");

		assert_eq!(request.uri(), "http://svc.local/users/1");
		assert!(request.headers().get(http::header::CONTENT_TYPE).is_none());
		assert!(request.body().is_empty());
	}

	#[test]
	fn zero_timeout_disables_the_deadline() {
		let client = client(ClientConfig::new("users", "http://svc.local").with_timeout(0));
		let request = client
			.build_request(&RequestContext::empty(), Method::GET, "/users/1")
			.expect("Request should build.");

		assert_eq!(client.timeout(), None);
		assert!(request.extensions().get::<RequestTimeout>().is_none());
	}

	#[test]
	fn invalid_inputs_are_reported() {
		let err = Client::new(
			ClientConfig::new("users", "http://svc.local").with_header("bad header", "v"),
			None,
			Arc::new(LogConfig::default()),
		)
		.expect_err("Invalid header name should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHeader { ref name } if name == "bad header"));

		let client = client(ClientConfig::new("users", "not a url"));
		let err = client
			.build_request(&RequestContext::empty(), Method::GET, "/x")
			.expect_err("Invalid basepath should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidUrl { .. })));
	}

	#[test]
	fn unserializable_body_is_a_serialization_error() {
		let client = client(ClientConfig::new("users", "http://svc.local"));
		let body = BTreeMap::from([((1, 2), "tuple keys are not JSON")]);
		let err = client
			.build_json_request(&RequestContext::empty(), Method::POST, "/x", &body)
			.expect_err("Tuple map keys should fail to serialize.");

		assert!(matches!(err, Error::Serialization(_)));
	}
}
