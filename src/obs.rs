//! Observability for outbound calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit the structured request/response [`LogRecord`]s on the
//!   `outbound_http::http` target and `outbound_http.call` spans carrying the `kind` and `key`
//!   fields.
//! - Enable `metrics` to increment the `outbound_http_call_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`.

mod log;
mod metrics;
mod tracing;

pub use log::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Kinds of outbound work observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// A request executed through a registered client.
	ClientCall,
	/// A token endpoint round-trip performed by a token source.
	TokenRenewal,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::ClientCall => "client_call",
			CallKind::TokenRenewal => "token_renewal",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Call entered.
	Attempt,
	/// Call completed with a response.
	Success,
	/// Call failed before a response was produced.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`CallSpan`] and records attempt plus success/failure outcomes.
pub(crate) async fn observe<Fut, T>(kind: CallKind, key: &str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, key);

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_call_outcome(kind, CallOutcome::Success),
		Err(_) => record_call_outcome(kind, CallOutcome::Failure),
	}

	result
}
