//! Structured request/response log records.
//!
//! Every outbound exchange produces one record per direction. Records are flat JSON objects so
//! the same shape can be shared with the inbound logging middleware of the host service.

// crates.io
use time::macros;
// self
use crate::{
	_prelude::*,
	trace::{RequestContext, TraceId},
};

/// `tracing` target the records are emitted on.
pub const LOG_TARGET: &str = "outbound_http::http";
/// Body characters kept per record unless configured otherwise.
pub const DEFAULT_MAX_BODY_LENGTH: usize = 1000;

const REDACTED: &str = "<redacted>";

/// Logging knobs shared by every transport chain built from one registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
	/// Maximum body characters kept per record; `0` keeps the whole body.
	pub max_body_length: usize,
	/// URL paths whose exchanges are never logged.
	pub exclude_urls: HashSet<String>,
}
impl LogConfig {
	/// Returns `true` when exchanges on `path` must not be logged.
	pub fn is_excluded(&self, path: &str) -> bool {
		self.exclude_urls.contains(path)
	}

	/// Builds the record describing an outgoing (or incoming) request.
	///
	/// Returns `None` when the request path is excluded.
	pub fn request_record<B>(&self, kind: LogType, request: &http::Request<B>) -> Option<LogRecord>
	where
		B: AsRef<[u8]>,
	{
		if self.is_excluded(request.uri().path()) {
			return None;
		}

		let ctx = RequestContext::of(request);

		Some(LogRecord {
			method: Some(request.method().to_string()),
			url: Some(log_url(request.uri())),
			headers: log_headers(request.headers()),
			body: self.log_body(request.body().as_ref()),
			..LogRecord::new(LogLevel::Info, kind, ctx.trace_id())
		})
	}

	/// Builds the record describing the response to a request sent as `method` to `uri`.
	///
	/// Returns `None` when the request path is excluded.
	pub fn response_record<B>(
		&self,
		kind: LogType,
		method: &Method,
		uri: &http::Uri,
		trace_id: Option<&TraceId>,
		response: &http::Response<B>,
	) -> Option<LogRecord>
	where
		B: AsRef<[u8]>,
	{
		if self.is_excluded(uri.path()) {
			return None;
		}

		Some(LogRecord {
			method: Some(method.to_string()),
			url: Some(log_url(uri)),
			status: Some(response.status().as_u16()),
			headers: log_headers(response.headers()),
			body: self.log_body(response.body().as_ref()),
			..LogRecord::new(LogLevel::Info, kind, trace_id)
		})
	}

	/// Builds the `ERROR` record for a request to `uri` that produced no response.
	///
	/// Returns `None` when the request path is excluded.
	pub fn failure_record(
		&self,
		method: &Method,
		uri: &http::Uri,
		trace_id: Option<&TraceId>,
		error: &dyn Display,
	) -> Option<LogRecord> {
		if self.is_excluded(uri.path()) {
			return None;
		}

		let url = log_url(uri);
		let message = format!("{method} {url} failed: {error}");

		Some(LogRecord {
			method: Some(method.to_string()),
			url: Some(url),
			..LogRecord::message(LogLevel::Error, message, trace_id)
		})
	}

	fn log_body(&self, body: &[u8]) -> String {
		let text = String::from_utf8_lossy(body);
		let compact = text.chars().filter(|c| !c.is_whitespace());

		if self.max_body_length == 0 {
			compact.collect()
		} else {
			compact.take(self.max_body_length).collect()
		}
	}
}
impl Default for LogConfig {
	fn default() -> Self {
		Self { max_body_length: DEFAULT_MAX_BODY_LENGTH, exclude_urls: HashSet::new() }
	}
}

/// Category of a log record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
	/// Request received by the host service.
	OuterRequest,
	/// Response returned by the host service.
	OuterResponse,
	/// Request sent to an upstream API.
	InnerRequest,
	/// Response received from an upstream API.
	InnerResponse,
	/// Free-form message.
	Message,
}

/// Severity of a log record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
	/// Diagnostic detail.
	Debug,
	/// Regular traffic records.
	Info,
	/// Recoverable anomalies.
	Warn,
	/// Failed exchanges.
	Error,
}

/// One flat log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogRecord {
	/// UTC time stamp, `yyyy-mm-ddTHH:mm:ss.SSS`.
	pub time: String,
	/// Trace id of the inbound request that caused the exchange.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trace_id: Option<String>,
	/// Severity.
	pub level: LogLevel,
	/// Record category.
	#[serde(rename = "type")]
	pub kind: LogType,
	/// Free-form message, for [`LogType::Message`] records.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// HTTP method.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	/// Host and path, without the query string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Response status.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Multi-valued headers; credentials are redacted.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, Vec<String>>,
	/// Body with whitespace stripped, truncated to the configured length.
	#[serde(skip_serializing_if = "String::is_empty")]
	pub body: String,
}
impl LogRecord {
	/// Builds a [`LogType::Message`] record.
	pub fn message(
		level: LogLevel,
		message: impl Into<String>,
		trace_id: Option<&TraceId>,
	) -> Self {
		Self { message: Some(message.into()), ..Self::new(level, LogType::Message, trace_id) }
	}

	fn new(level: LogLevel, kind: LogType, trace_id: Option<&TraceId>) -> Self {
		Self {
			time: log_time(OffsetDateTime::now_utc()),
			trace_id: trace_id.map(ToString::to_string),
			level,
			kind,
			message: None,
			method: None,
			url: None,
			status: None,
			headers: BTreeMap::new(),
			body: String::new(),
		}
	}

	/// Renders the record as a single JSON line.
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).unwrap_or_default()
	}
}

/// Emits `record` as one `tracing` event on [`LOG_TARGET`] at the record's level.
pub fn emit(record: &LogRecord) {
	#[cfg(feature = "tracing")]
	{
		let line = record.to_json();

		match record.level {
			LogLevel::Debug => tracing::debug!(target: LOG_TARGET, "{line}"),
			LogLevel::Info => tracing::info!(target: LOG_TARGET, "{line}"),
			LogLevel::Warn => tracing::warn!(target: LOG_TARGET, "{line}"),
			LogLevel::Error => tracing::error!(target: LOG_TARGET, "{line}"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = record;
	}
}

fn log_time(instant: OffsetDateTime) -> String {
	instant
		.format(macros::format_description!(
			"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
		))
		.unwrap_or_default()
}

fn log_url(uri: &http::Uri) -> String {
	let host = uri.host().unwrap_or_default();

	match uri.port_u16() {
		Some(port) => format!("{host}:{port}{}", uri.path()),
		None => format!("{host}{}", uri.path()),
	}
}

fn log_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
	let mut out = BTreeMap::<String, Vec<String>>::new();

	for (name, value) in headers {
		let value = if value.is_sensitive() || *name == http::header::AUTHORIZATION {
			REDACTED.to_owned()
		} else {
			String::from_utf8_lossy(value.as_bytes()).into_owned()
		};

		out.entry(name.as_str().to_owned()).or_default().push(value);
	}

	out
}
