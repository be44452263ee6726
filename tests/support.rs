//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};
// self
use outbound_http::{
	error::{Error, TransportError},
	reqwest::header::HeaderMap,
	transport::{HttpRequest, HttpResponse, Transport, TransportFuture},
};

/// What a [`ScriptedTransport`] saw of one request.
#[derive(Clone, Debug)]
pub struct SeenRequest {
	pub method: String,
	pub uri: String,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}

/// Base transport that answers every request with a canned response (or failure) and records
/// what it was sent.
pub struct ScriptedTransport {
	status: u16,
	body: Vec<u8>,
	fail: bool,
	calls: AtomicUsize,
	seen: Mutex<Vec<SeenRequest>>,
}
impl ScriptedTransport {
	pub fn responding(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status,
			body: body.into(),
			fail: false,
			calls: AtomicUsize::new(0),
			seen: Mutex::new(Vec::new()),
		}
	}

	pub fn failing() -> Self {
		Self { fail: true, ..Self::responding(0, Vec::new()) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn seen(&self) -> Vec<SeenRequest> {
		self.seen.lock().expect("Seen requests lock should not be poisoned.").clone()
	}

	pub fn last(&self) -> SeenRequest {
		self.seen().pop().expect("At least one request should have been sent.")
	}
}
impl Transport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().expect("Seen requests lock should not be poisoned.").push(SeenRequest {
			method: request.method().to_string(),
			uri: request.uri().to_string(),
			headers: request.headers().clone(),
			body: request.body().clone(),
		});

		let result = if self.fail {
			Err(Error::from(TransportError::Io(std::io::Error::other("connection reset"))))
		} else {
			let mut response = HttpResponse::new(self.body.clone());

			*response.status_mut() =
				self.status.try_into().expect("Scripted status should be a valid HTTP status.");

			Ok(response)
		};

		Box::pin(async move { result })
	}
}

/// Base transport whose calls never complete.
pub struct HangingTransport;
impl Transport for HangingTransport {
	fn execute(&self, _: HttpRequest) -> TransportFuture<'_> {
		Box::pin(std::future::pending())
	}
}
