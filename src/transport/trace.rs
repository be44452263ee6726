//! Trace-id propagation layer.

// self
use crate::{
	_prelude::*,
	trace::{RequestContext, TRACE_ID_HEADER},
	transport::{HttpRequest, Transport, TransportFuture},
};

/// Copies the request context's trace id into the [`TRACE_ID_HEADER`] header.
///
/// Requests without a trace id (or with one that is not a valid header value) pass through
/// untouched; this layer never fails.
pub struct TracingTransport {
	inner: Arc<dyn Transport>,
}
impl TracingTransport {
	/// Wraps `inner`.
	pub fn new(inner: Arc<dyn Transport>) -> Self {
		Self { inner }
	}
}
impl Transport for TracingTransport {
	fn execute(&self, mut request: HttpRequest) -> TransportFuture<'_> {
		let header = RequestContext::of(&request)
			.trace_id()
			.and_then(|id| HeaderValue::from_str(id.as_str()).ok());

		if let Some(value) = header {
			request.headers_mut().insert(TRACE_ID_HEADER, value);
		}

		self.inner.execute(request)
	}
}
