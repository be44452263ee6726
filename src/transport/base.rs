//! Default base transport backed by reqwest.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	transport::{HttpRequest, HttpResponse, Transport, TransportFuture},
};

/// Per-request deadline, attached to a request's extensions by the owning client.
///
/// Covers connecting, sending, and reading the whole response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTimeout(pub StdDuration);

/// Sends requests with a shared [`ReqwestClient`].
///
/// Redirects follow reqwest's default policy; TLS verification is on unless the client was
/// built with `skip_ssl`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(ReqwestClient);
impl ReqwestTransport {
	/// Builds a dedicated reqwest client, optionally accepting any TLS certificate.
	pub fn new(skip_ssl: bool) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().danger_accept_invalid_certs(skip_ssl).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Transport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let timeout = request.extensions().get::<RequestTimeout>().map(|t| t.0);
			let mut request: reqwest::Request = request.try_into()?;

			*request.timeout_mut() = timeout;

			let response = self.0.execute(request).await?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
