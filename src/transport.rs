//! Composable request/response interceptors around a base HTTP sender.
//!
//! Every registered client owns one chain assembled by [`assemble_transport`]:
//!
//! ```text
//! AuthTransport (only with a token source)
//!   └─ TracingTransport
//!        └─ LoggingTransport
//!             └─ base (ReqwestTransport, or a caller-supplied Transport)
//! ```
//!
//! Bodies are fully buffered, so every layer can inspect them without starving the next one.

pub mod auth;
pub mod base;
pub mod logging;
pub mod trace;

pub use auth::*;
pub use base::*;
pub use logging::*;
pub use trace::*;

// self
use crate::{_prelude::*, auth::TokenSource, error::ConfigError, obs::LogConfig};

/// Buffered outbound request.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Buffered upstream response.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Future returned by [`Transport::execute`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Single-method capability every chain layer implements.
///
/// Implementations must be `Send + Sync + 'static` so one chain can serve every concurrent
/// caller of a client. Failures are returned unchanged to the caller; no layer retries.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the upstream response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Builds the standard chain for one client.
///
/// `base` replaces the default [`ReqwestTransport`] (and then `skip_ssl` has no effect); the
/// logging and tracing layers always wrap it, and the auth layer is added only when
/// `token_source` is present.
pub fn assemble_transport(
	skip_ssl: bool,
	base: Option<Arc<dyn Transport>>,
	token_source: Option<Arc<TokenSource>>,
	log: Arc<LogConfig>,
) -> Result<Arc<dyn Transport>, ConfigError> {
	let base = match base {
		Some(base) => base,
		None => Arc::new(ReqwestTransport::new(skip_ssl)?),
	};
	let logging = Arc::new(LoggingTransport::new(base, log));
	let tracing = Arc::new(TracingTransport::new(logging));

	Ok(match token_source {
		Some(source) => Arc::new(AuthTransport::new(tracing, source)),
		None => tracing,
	})
}
