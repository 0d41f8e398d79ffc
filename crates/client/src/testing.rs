//! In-process transport for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::Value;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// What a [`ScriptedTransport`] answers with.
#[derive(Debug, Clone)]
pub enum Reply {
	Json { status: StatusCode, body: Value },
	Unreachable,
	Delayed(Duration, Box<Reply>),
}

impl Reply {
	pub fn ok(body: Value) -> Self {
		Self::Json {
			status: StatusCode::OK,
			body,
		}
	}

	pub fn status(status: u16, body: Value) -> Self {
		Self::Json {
			status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
			body,
		}
	}

	pub fn after(self, delay: Duration) -> Self {
		Self::Delayed(delay, Box::new(self))
	}
}

type Route = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

/// Answers every request through a routing closure and records it.
pub struct ScriptedTransport {
	route: Route,
	log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
	pub fn new(route: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
		Arc::new(Self {
			route: Box::new(route),
			log: Mutex::new(Vec::new()),
		})
	}

	/// Every request received so far, in arrival order.
	pub fn requests(&self) -> Vec<HttpRequest> {
		self.log.lock().clone()
	}

	/// Number of requests received for `path`.
	pub fn count(&self, path: &str) -> usize {
		self.log.lock().iter().filter(|request| request.path() == path).count()
	}
}

#[async_trait]
impl Transport for ScriptedTransport {
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let mut reply = (self.route)(&request);
		self.log.lock().push(request);
		loop {
			match reply {
				Reply::Json { status, body } => return Ok(HttpResponse::new(status, body)),
				Reply::Unreachable => return Err(TransportError("connection refused".into())),
				Reply::Delayed(delay, inner) => {
					tokio::time::sleep(delay).await;
					reply = *inner;
				}
			}
		}
	}
}
