//! Error types shared by the registry, transport chain, token sources, and decoders.

// self
use crate::{
	_prelude::*,
	auth::TokenBuildError,
	decode::{DecodeError, ValidationErrors},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Startup configuration problem; fatal for process start.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Lookup of a client key that was never registered.
	#[error("Client `{key}` is not registered.")]
	ClientNotRegistered {
		/// Key that missed.
		key: String,
	},
	/// Network or connection failure, surfaced unchanged up the chain.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token renewal failed; the request was never sent unauthenticated.
	#[error(transparent)]
	TokenRenewal(#[from] TokenRenewalError),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	Serialization(#[source] serde_json::Error),
}

/// Configuration and construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A client references a token source that is not configured yet.
	#[error("Client configuration failed: couldn't find token source with key `{key}`.")]
	MissingTokenSource {
		/// Referenced token source key.
		key: String,
	},
	/// A token source references a client that is not configured yet.
	#[error("Token source configuration failed: couldn't find client with key `{key}`.")]
	MissingClient {
		/// Referenced client key.
		key: String,
	},
	/// A client the application depends on is absent from the configuration file.
	#[error("Couldn't find required client with key `{key}` in the configuration.")]
	RequiredClient {
		/// Required client key.
		key: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Basepath + path does not form a valid URL.
	#[error("`{url}` is not a valid URL.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Default header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Configuration file could not be read.
	#[error("Configuration file `{path}` could not be read.")]
	Read {
		/// File path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file is not valid JSON for the expected schema.
	#[error("Configuration file could not be parsed.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while executing the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while executing the request.")]
	Io(#[from] std::io::Error),
	/// The client's deadline elapsed before the chain produced a response.
	#[error("Request did not complete within {timeout:?}.")]
	Timeout {
		/// Deadline that elapsed.
		timeout: StdDuration,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		TransportError::from(e).into()
	}
}

/// Failures raised while renewing a token source's cached token.
#[derive(Debug, ThisError)]
pub enum TokenRenewalError {
	/// The token request could not be built or executed.
	#[error("Token request to `{endpoint}` failed.")]
	Request {
		/// Token endpoint.
		endpoint: String,
		/// Underlying chain failure.
		#[source]
		source: Box<Error>,
	},
	/// The token endpoint answered with a body matching neither schema.
	#[error("Token endpoint response could not be decoded.")]
	Decode(#[source] DecodeError),
	/// The token endpoint answered with a well-formed but unusable body.
	#[error("Token endpoint response failed validation: {0}.")]
	Validation(ValidationErrors),
	/// The token endpoint answered with an OAuth 2.0 error body.
	#[error("Token endpoint rejected the request: {error}.")]
	Rejected {
		/// RFC 6749 error code.
		error: String,
		/// Optional human-readable description.
		description: Option<String>,
	},
	/// The decoded response could not be turned into a token.
	#[error("Token could not be built from the endpoint response.")]
	InvalidToken(#[from] TokenBuildError),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn renewal_error_keeps_transport_source() {
		let transport = TransportError::Io(std::io::Error::other("connection reset"));
		let err: Error = TokenRenewalError::Request {
			endpoint: "http://auth.local/token".into(),
			source: Box::new(transport.into()),
		}
		.into();

		assert!(matches!(err, Error::TokenRenewal(TokenRenewalError::Request { .. })));
		assert!(err.to_string().contains("http://auth.local/token"));

		let source = StdError::source(&err)
			.expect("Renewal error should expose the chain failure as source.");

		assert!(source.to_string().contains("I/O error"));
	}

	#[test]
	fn missing_reference_errors_name_the_key() {
		let err: Error = ConfigError::MissingTokenSource { key: "partner-oauth".into() }.into();

		assert!(err.to_string().contains("partner-oauth"));

		let err: Error = ConfigError::MissingClient { key: "partner-auth".into() }.into();

		assert!(err.to_string().contains("partner-auth"));
	}
}
