//! Request/response logging layer.

// self
use crate::{
	_prelude::*,
	obs::{self, LogConfig, LogType},
	trace::RequestContext,
	transport::{HttpRequest, Transport, TransportFuture},
};

/// Emits an `INNER_REQUEST` record before delegating and an `INNER_RESPONSE` record after.
///
/// Errors from the inner transport are returned unchanged; they are logged as an `ERROR`
/// message record (host and path only, like every other record) instead of a response record.
pub struct LoggingTransport {
	inner: Arc<dyn Transport>,
	log: Arc<LogConfig>,
}
impl LoggingTransport {
	/// Wraps `inner` with the given logging settings.
	pub fn new(inner: Arc<dyn Transport>, log: Arc<LogConfig>) -> Self {
		Self { inner, log }
	}
}
impl Transport for LoggingTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if let Some(record) = self.log.request_record(LogType::InnerRequest, &request) {
				obs::emit(&record);
			}

			let ctx = RequestContext::of(&request);
			let method = request.method().clone();
			let uri = request.uri().clone();

			match self.inner.execute(request).await {
				Ok(response) => {
					if let Some(record) = self.log.response_record(
						LogType::InnerResponse,
						&method,
						&uri,
						ctx.trace_id(),
						&response,
					) {
						obs::emit(&record);
					}

					Ok(response)
				},
				Err(e) => {
					if let Some(record) =
						self.log.failure_record(&method, &uri, ctx.trace_id(), &e)
					{
						obs::emit(&record);
					}

					Err(e)
				},
			}
		})
	}
}
