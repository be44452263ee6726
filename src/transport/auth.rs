//! OAuth 2.0 bearer authentication layer.

// self
use crate::{
	_prelude::*,
	auth::{TokenBuildError, TokenSource},
	error::TokenRenewalError,
	trace::RequestContext,
	transport::{HttpRequest, Transport, TransportFuture},
};

/// Sets `Authorization: <type> <token>` from a bound [`TokenSource`] before delegating.
///
/// When no valid token can be obtained the error is returned and the request is never sent.
pub struct AuthTransport {
	inner: Arc<dyn Transport>,
	source: Arc<TokenSource>,
}
impl AuthTransport {
	/// Wraps `inner`, authenticating every request with `source`.
	pub fn new(inner: Arc<dyn Transport>, source: Arc<TokenSource>) -> Self {
		Self { inner, source }
	}

	/// Token source this layer draws from.
	pub fn token_source(&self) -> &Arc<TokenSource> {
		&self.source
	}
}
impl Transport for AuthTransport {
	fn execute(&self, mut request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let ctx = RequestContext::of(&request);
			let token = self.source.token(&ctx).await?;
			let mut value = HeaderValue::from_str(&token.authorization())
				.map_err(|_| TokenRenewalError::InvalidToken(TokenBuildError::InvalidHeaderValue))?;

			value.set_sensitive(true);
			request.headers_mut().insert(http::header::AUTHORIZATION, value);

			self.inner.execute(request).await
		})
	}
}
