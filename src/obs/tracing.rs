// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span wrapping one client call or token renewal.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the call kind and the client or token source key.
	pub fn new(kind: CallKind, key: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("outbound_http.call", kind = kind.as_str(), key);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, key);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn call_span_builds_without_subscriber() {
		let _span = CallSpan::new(CallKind::ClientCall, "partner-api");
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::TokenRenewal, "partner-oauth");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
