use thiserror::Error;

/// Failures at the push-socket seam.
#[derive(Debug, Error)]
pub enum SocketError {
	#[error("failed to open notification socket: {0}")]
	Connect(String),

	#[error("failed to send frame: {0}")]
	Send(String),

	#[error("failed to receive frame: {0}")]
	Receive(String),
}

pub type Result<T> = std::result::Result<T, SocketError>;
