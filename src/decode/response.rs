//! Shape-based classification of upstream response bodies.
//!
//! Upstream APIs return success and error payloads under overlapping status codes, so the
//! status alone cannot tell them apart. The body is tried against the success schema first
//! and, only when that fails to deserialize, against the error schema.

// self
use crate::{
	_prelude::*,
	decode::{Validate, ValidationErrors, Violations},
};

/// Outcome category of decoding an upstream response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseClass {
	/// Body matched the success schema and passed validation.
	Ok,
	/// Body matched the error schema and passed validation.
	ExternalError,
	/// Body matched no schema.
	DecodeError,
	/// Body matched a schema but violated its constraints.
	ValidationError,
}
impl ResponseClass {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResponseClass::Ok => "OK",
			ResponseClass::ExternalError => "EXTERNAL_ERROR",
			ResponseClass::DecodeError => "DECODE_ERROR",
			ResponseClass::ValidationError => "VALIDATION_ERROR",
		}
	}
}
impl Display for ResponseClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A body that does not fit a schema, with the JSON path where deserialization stopped.
#[derive(Debug, ThisError)]
#[error("{source} (at `{path}`)")]
pub struct SchemaMismatch {
	/// Dotted JSON path of the failure; `.` for the document root.
	pub path: String,
	/// Underlying deserializer failure.
	pub source: serde_json::Error,
}

/// Body matched neither the success schema nor (when given) the error schema.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Only a success schema was supplied and the body did not fit it.
	#[error("Error unmarshalling ok response: {source}.")]
	Ok {
		/// Success-schema failure, with the JSON path where it happened.
		#[source]
		source: SchemaMismatch,
	},
	/// Both schemas were tried and neither fit.
	#[error("Error retrieving response. Ok unmarshal error: {ok}; error unmarshal error: {err}.")]
	Both {
		/// Success-schema failure.
		ok: SchemaMismatch,
		/// Error-schema failure.
		err: SchemaMismatch,
	},
}

/// Placeholder error schema for endpoints whose failures are not modelled.
///
/// Uninhabited, so a body can never decode into it and [`Decoded::ExternalError`] cannot occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoErrorSchema {}
impl<'de> Deserialize<'de> for NoErrorSchema {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let _ = serde::de::IgnoredAny::deserialize(deserializer)?;

		Err(serde::de::Error::custom("no error schema is declared for this response"))
	}
}
impl Validate for NoErrorSchema {
	fn validate(&self, _: &mut Violations) {
		match *self {}
	}
}

/// Classified response body.
#[derive(Debug)]
pub enum Decoded<T, E = NoErrorSchema> {
	/// Success payload.
	Ok(T),
	/// Error payload returned by the upstream API.
	ExternalError(E),
	/// Body matched no schema.
	DecodeError(DecodeError),
	/// Body matched a schema but violated its constraints.
	ValidationError(ValidationErrors),
}
impl<T, E> Decoded<T, E> {
	/// Classification of this outcome.
	pub fn class(&self) -> ResponseClass {
		match self {
			Decoded::Ok(_) => ResponseClass::Ok,
			Decoded::ExternalError(_) => ResponseClass::ExternalError,
			Decoded::DecodeError(_) => ResponseClass::DecodeError,
			Decoded::ValidationError(_) => ResponseClass::ValidationError,
		}
	}

	/// Success payload, if any.
	pub fn ok(self) -> Option<T> {
		match self {
			Decoded::Ok(value) => Some(value),
			_ => None,
		}
	}
}

/// Decodes `body` against the success schema `T` only.
pub fn decode_body<T>(body: &[u8]) -> Decoded<T>
where
	T: DeserializeOwned + Validate,
{
	classify(body, false)
}

/// Decodes `body` against the success schema `T`, falling back to the error schema `E`.
pub fn decode_body_or_error<T, E>(body: &[u8]) -> Decoded<T, E>
where
	T: DeserializeOwned + Validate,
	E: DeserializeOwned + Validate,
{
	classify(body, true)
}

/// Decodes a buffered response body against the success schema `T` only.
pub fn decode_response<T>(response: &http::Response<Vec<u8>>) -> Decoded<T>
where
	T: DeserializeOwned + Validate,
{
	decode_body(response.body())
}

/// Decodes a buffered response body with success/error disambiguation.
pub fn decode_response_or_error<T, E>(response: &http::Response<Vec<u8>>) -> Decoded<T, E>
where
	T: DeserializeOwned + Validate,
	E: DeserializeOwned + Validate,
{
	decode_body_or_error(response.body())
}

fn classify<T, E>(body: &[u8], with_error_schema: bool) -> Decoded<T, E>
where
	T: DeserializeOwned + Validate,
	E: DeserializeOwned + Validate,
{
	let ok_err = match parse::<T>(body) {
		Ok(value) =>
			return match value.check() {
				Ok(()) => Decoded::Ok(value),
				Err(violations) => Decoded::ValidationError(violations),
			},
		Err(e) => e,
	};

	if !with_error_schema {
		return Decoded::DecodeError(DecodeError::Ok { source: ok_err });
	}

	match parse::<E>(body) {
		Ok(value) => match value.check() {
			Ok(()) => Decoded::ExternalError(value),
			Err(violations) => Decoded::ValidationError(violations),
		},
		Err(err) => Decoded::DecodeError(DecodeError::Both { ok: ok_err, err }),
	}
}

pub(crate) fn parse<T>(body: &[u8]) -> Result<T, SchemaMismatch>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de).map_err(|e| SchemaMismatch {
		path: e.path().to_string(),
		source: e.into_inner(),
	})?;

	// Reject trailing data the same way `serde_json::from_slice` does.
	de.end().map_err(|source| SchemaMismatch { path: ".".into(), source })?;

	Ok(value)
}
