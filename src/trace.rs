//! Trace-id propagation contract shared by the inbound boundary and the outbound chain.
//!
//! The inbound middleware (outside this crate) builds a [`RequestContext`] per request with
//! [`RequestContext::from_headers`] and threads it into every outbound call. The context rides
//! inside the outbound request's [`http::Extensions`], where the tracing transport picks it up
//! and stamps [`TRACE_ID_HEADER`].

// self
use crate::_prelude::*;

/// Header carrying the trace id on inbound and outbound requests.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Per-inbound-request correlation identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);
impl TraceId {
	/// Wraps an existing identifier.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Generates a fresh identifier from 128 random bits, hex encoded.
	pub fn generate() -> Self {
		Self(format!("{:032x}", rand::random::<u128>()))
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TraceId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for TraceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TraceId({})", self.0)
	}
}
impl Display for TraceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Association context attached to outbound requests.
///
/// Cancellation is not carried here: dropping the future of a call aborts it, token renewals
/// included.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
	trace_id: Option<TraceId>,
}
impl RequestContext {
	/// Context without a trace id; outbound requests go out untouched by the tracing layer.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Context carrying `trace_id`.
	pub fn with_trace_id(trace_id: TraceId) -> Self {
		Self { trace_id: Some(trace_id) }
	}

	/// Reuses a non-empty incoming [`TRACE_ID_HEADER`] or generates a new trace id.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let incoming = headers
			.get(TRACE_ID_HEADER)
			.and_then(|v| v.to_str().ok())
			.map(str::trim)
			.filter(|v| !v.is_empty());

		match incoming {
			Some(value) => Self::with_trace_id(TraceId::new(value)),
			None => Self::with_trace_id(TraceId::generate()),
		}
	}

	/// Trace id carried by this context, if any.
	pub fn trace_id(&self) -> Option<&TraceId> {
		self.trace_id.as_ref()
	}

	/// Reads the context stored in a request's extensions; empty when none was attached.
	pub fn of<B>(request: &http::Request<B>) -> Self {
		request.extensions().get::<Self>().cloned().unwrap_or_default()
	}
}
