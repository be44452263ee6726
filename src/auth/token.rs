//! Immutable bearer tokens, their validity predicate, and the builder used by renewals.

mod secret;

pub use secret::*;

// self
use crate::_prelude::*;

/// Margin subtracted from the server-declared expiry before a token counts as stale.
pub const DEFAULT_EXPIRY_DELTA: Duration = Duration::seconds(60);
/// Token type assumed when the endpoint omits one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Cache state of a token source, as seen at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenState {
	/// Nothing cached yet (or the cache was invalidated).
	Empty,
	/// Cached token passes the validity predicate.
	Valid,
	/// Cached token is empty or inside the expiry-delta window; the next call renews it.
	Stale,
}

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenBuildError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when `issued_at + expires_in` overflows the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Issued when the token cannot be carried in an `Authorization` header.
	#[error("Token type or value contains characters not allowed in an HTTP header.")]
	InvalidHeaderValue,
}

/// Credentials attached to authenticated requests.
///
/// Tokens never change after construction; a stale token is replaced wholesale.
#[derive(Clone)]
pub struct Token {
	/// Token type, normally `Bearer`.
	pub token_type: String,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token was stored.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry; `None` means the token never expires.
	pub expires_at: Option<OffsetDateTime>,
	/// Skew margin subtracted from `expires_at` by the validity predicate.
	pub expiry_delta: Duration,
}
impl Token {
	/// Returns a builder stamped with the default token type and expiry delta.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Validity predicate: a non-empty access token and `instant < expires_at - expiry_delta`.
	/// Tokens without an expiry are always valid.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		if self.access_token.is_empty() {
			return false;
		}

		match self.expires_at {
			None => true,
			Some(expires_at) => expires_at
				.checked_sub(self.expiry_delta)
				.is_some_and(|stale_at| instant < stale_at),
		}
	}

	/// Convenience helper that evaluates [`Token::is_valid_at`] against the current UTC clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Value for the `Authorization` header: `<type> <token>`.
	pub fn authorization(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("token_type", &self.token_type)
			.field("access_token", &self.access_token)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("expiry_delta", &self.expiry_delta)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug)]
pub struct TokenBuilder {
	token_type: String,
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	expiry_delta: Duration,
}
impl TokenBuilder {
	/// Sets the token type; blank values fall back to [`DEFAULT_TOKEN_TYPE`].
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		let token_type = token_type.into();

		if !token_type.trim().is_empty() {
			self.token_type = token_type;
		}

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Overrides the expiry delta (defaults to [`DEFAULT_EXPIRY_DELTA`]).
	pub fn expiry_delta(mut self, delta: Duration) -> Self {
		self.expiry_delta = delta;

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuildError> {
		let access_token = self.access_token.ok_or(TokenBuildError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(issued_at.checked_add(delta).ok_or(TokenBuildError::ExpiresInOutOfRange)?),
			(None, None) => None,
		};

		Ok(Token {
			token_type: self.token_type,
			access_token,
			issued_at,
			expires_at,
			expiry_delta: self.expiry_delta,
		})
	}
}
impl Default for TokenBuilder {
	fn default() -> Self {
		Self {
			token_type: DEFAULT_TOKEN_TYPE.into(),
			access_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
			expiry_delta: DEFAULT_EXPIRY_DELTA,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token_issued_at(issued: OffsetDateTime, expires_in: Duration) -> Token {
		Token::builder()
			.access_token("access")
			.issued_at(issued)
			.expires_in(expires_in)
			.build()
			.expect("Token builder should succeed for validity fixtures.")
	}

	#[test]
	fn hour_long_token_goes_stale_inside_default_delta() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = token_issued_at(issued, Duration::seconds(3600));

		assert_eq!(token.expires_at, Some(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(token.is_valid_at(issued + Duration::seconds(3000)));
		assert!(token.is_valid_at(issued + Duration::seconds(3539)));
		assert!(!token.is_valid_at(issued + Duration::seconds(3540)));
		assert!(!token.is_valid_at(issued + Duration::seconds(3600)));
	}

	#[test]
	fn validity_matches_predicate_across_offsets() {
		let issued = macros::datetime!(2025-06-01 12:00 UTC);

		for (expires_in, delta) in [(120, 60), (600, 0), (30, 60), (3600, 300)] {
			let token = Token::builder()
				.access_token("access")
				.issued_at(issued)
				.expires_in(Duration::seconds(expires_in))
				.expiry_delta(Duration::seconds(delta))
				.build()
				.expect("Token builder should succeed for predicate fixtures.");

			for offset in [-10, 0, 29, 59, 60, 61, 119, 120, 599, 3299, 3300, 4000] {
				let now = issued + Duration::seconds(offset);
				let expected = offset < expires_in - delta;

				assert_eq!(
					token.is_valid_at(now),
					expected,
					"expires_in={expires_in} delta={delta} offset={offset}",
				);
			}
		}
	}

	#[test]
	fn tokens_without_expiry_never_go_stale() {
		let token = Token::builder()
			.access_token("forever")
			.build()
			.expect("Token builder should accept a missing expiry.");

		assert_eq!(token.expires_at, None);
		assert!(token.is_valid_at(macros::datetime!(2999-12-31 23:59 UTC)));
		assert!(token.is_valid());
	}

	#[test]
	fn empty_access_token_is_never_valid() {
		let token = Token::builder()
			.access_token("")
			.build()
			.expect("Token builder should accept an empty access token.");

		assert!(!token.is_valid_at(macros::datetime!(2000-01-01 00:00 UTC)));
	}

	#[test]
	fn builder_requires_access_token_and_defaults_type() {
		assert_eq!(Token::builder().build().unwrap_err(), TokenBuildError::MissingAccessToken);

		let token = Token::builder()
			.token_type(" ")
			.access_token("abc")
			.build()
			.expect("Blank token type should fall back to the default.");

		assert_eq!(token.token_type, DEFAULT_TOKEN_TYPE);
		assert_eq!(token.authorization(), "Bearer abc");
		assert_eq!(token.expiry_delta, DEFAULT_EXPIRY_DELTA);
		assert!(!format!("{token:?}").contains("abc"));
	}
}
