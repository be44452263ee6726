//! Inbound JSON body decoding with a client-facing error taxonomy.
//!
//! The caller here is an end user rather than a trusted partner API, so every failure is mapped
//! to a [`SuggestedHttpError`] the presentation layer can render as-is.

// crates.io
use serde_json::error::Category;
// self
use crate::{_prelude::*, decode::Validate};

/// Hard cap on inbound body size.
pub const MAX_REQUEST_BODY_BYTES: usize = 1 << 20;

/// Rejection of an inbound body, with the status the handler should answer with.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message} ({status}).")]
pub struct SuggestedHttpError {
	/// Suggested response status.
	pub status: StatusCode,
	/// Client-facing message.
	pub message: String,
}
impl SuggestedHttpError {
	fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self { status, message: message.into() }
	}

	fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, message)
	}
}

/// Decodes and validates the JSON body of an inbound request.
pub fn decode_request<T, B>(request: &http::Request<B>) -> Result<T, SuggestedHttpError>
where
	T: DeserializeOwned + Validate,
	B: AsRef<[u8]>,
{
	decode_request_body(request.headers(), request.body().as_ref())
}

/// Header + body form of [`decode_request`] for routers that split the request up front.
pub fn decode_request_body<T>(headers: &HeaderMap, body: &[u8]) -> Result<T, SuggestedHttpError>
where
	T: DeserializeOwned + Validate,
{
	check_content_type(headers)?;

	let oversized = body.len() > MAX_REQUEST_BODY_BYTES;
	let capped = &body[..body.len().min(MAX_REQUEST_BODY_BYTES)];

	if !oversized && capped.iter().all(u8::is_ascii_whitespace) {
		return Err(SuggestedHttpError::bad_request("Request body must not be empty"));
	}

	// A single JSON value is read; bytes after it are ignored.
	let mut de = serde_json::Deserializer::from_slice(capped);
	let value: T = match serde_path_to_error::deserialize(&mut de) {
		Ok(value) => value,
		Err(_) if oversized => {
			return Err(SuggestedHttpError::new(
				StatusCode::PAYLOAD_TOO_LARGE,
				"Request body must not be larger than 1 MB",
			));
		},
		Err(e) => return Err(classify(capped, e)),
	};

	validate_request(&value)?;

	Ok(value)
}

/// Runs field validation on an already-decoded inbound value.
pub fn validate_request<T>(value: &T) -> Result<(), SuggestedHttpError>
where
	T: ?Sized + Validate,
{
	value.check().map_err(|violations| SuggestedHttpError::bad_request(violations.to_string()))
}

fn check_content_type(headers: &HeaderMap) -> Result<(), SuggestedHttpError> {
	let Some(content_type) = headers.get(http::header::CONTENT_TYPE) else {
		return Err(SuggestedHttpError::new(
			StatusCode::UNSUPPORTED_MEDIA_TYPE,
			"Content-Type header is missing",
		));
	};

	if content_type.as_bytes().starts_with(b"application/json") {
		Ok(())
	} else {
		Err(SuggestedHttpError::new(
			StatusCode::UNSUPPORTED_MEDIA_TYPE,
			"Content-Type header is not application/json",
		))
	}
}

fn classify(body: &[u8], e: serde_path_to_error::Error<serde_json::Error>) -> SuggestedHttpError {
	let path = e.path().to_string();
	let inner = e.into_inner();
	let offset = byte_offset(body, inner.line(), inner.column());

	match inner.classify() {
		Category::Syntax => SuggestedHttpError::bad_request(format!(
			"Request body contains badly-formed JSON (at position {offset})"
		)),
		Category::Eof => SuggestedHttpError::bad_request("Request body contains badly-formed JSON"),
		Category::Data if path != "." => SuggestedHttpError::bad_request(format!(
			"Request body contains an invalid value for the {path:?} field (at position {offset})"
		)),
		Category::Data => SuggestedHttpError::bad_request(format!(
			"Request body does not match the expected shape (at position {offset}): {inner}"
		)),
		Category::Io => SuggestedHttpError::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			"Unrecognized error when decoding request JSON body",
		),
	}
}

// serde_json reports 1-based line/column; callers expect a byte offset into the body.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
	let line_start = body
		.split_inclusive(|b| *b == b'\n')
		.take(line.saturating_sub(1))
		.map(<[u8]>::len)
		.sum::<usize>();

	(line_start + column).min(body.len())
}
