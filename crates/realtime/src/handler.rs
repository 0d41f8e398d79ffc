//! Callbacks from the channel driver.

use std::sync::Arc;

use crate::message::ServerMessage;

/// Receives channel events.
///
/// Called from the driver task; implementations should hand work off
/// rather than block.
pub trait NotificationHandler: Send + Sync {
	/// A `NOTIFICATION` frame arrived. Called before it is acknowledged.
	fn on_notification(&self, _message: &ServerMessage) {}

	/// A socket opened.
	fn on_connect(&self) {}

	/// A socket closed unexpectedly, or failed to open.
	fn on_disconnect(&self) {}
}

/// Handler that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationHandler;

impl NotificationHandler for NoOpNotificationHandler {}

pub type SharedNotificationHandler = Arc<dyn NotificationHandler>;
