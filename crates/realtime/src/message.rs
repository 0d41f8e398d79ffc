//! Push frame codec.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use threadly_client::{ApiError, NotificationItem, NotificationType};

/// Frame type carrying a notification.
pub const NOTIFICATION: &str = "NOTIFICATION";

/// Frame type of the client acknowledgement.
pub const ACK: &str = "ACK";

/// A JSON text frame from the notification server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
	/// `NOTIFICATION`, `ACK`, `RESYNC`, or anything the server adds later.
	#[serde(rename = "type")]
	pub kind: String,
	pub event_id: Option<String>,
	pub sort_id: Option<String>,
	pub occurred_at: Option<String>,
	pub payload: Option<Value>,
}

impl ServerMessage {
	pub fn parse(text: &str) -> serde_json::Result<Self> {
		serde_json::from_str(text)
	}

	pub fn is_notification(&self) -> bool {
		self.kind == NOTIFICATION
	}

	pub fn notification_type(&self) -> NotificationType {
		self.payload
			.as_ref()
			.and_then(|payload| payload.get("notificationType"))
			.and_then(Value::as_str)
			.map_or(NotificationType::Unknown, NotificationType::parse)
	}

	/// The frame as a [`NotificationItem`], for handlers that render it like
	/// a list entry.
	pub fn to_item(&self) -> Result<NotificationItem, ApiError> {
		let mut item = match &self.payload {
			Some(Value::Object(payload)) => payload.clone(),
			_ => Map::new(),
		};
		let envelope = [
			("eventId", &self.event_id),
			("sortId", &self.sort_id),
			("occurredAt", &self.occurred_at),
		];
		for (key, value) in envelope {
			if let Some(value) = value {
				item.insert(key.to_string(), Value::String(value.clone()));
			}
		}
		NotificationItem::from_value(&Value::Object(item))
	}
}

/// Client acknowledgement of the last received event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
	#[serde(rename = "type")]
	kind: &'static str,
	last_received_id: String,
}

impl Ack {
	pub fn new(last_received_id: impl Into<String>) -> Self {
		Self {
			kind: ACK,
			last_received_id: last_received_id.into(),
		}
	}

	pub fn last_received_id(&self) -> &str {
		&self.last_received_id
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use threadly_client::notifications::NotificationMetadata;

	use super::*;

	#[test]
	fn parses_notification_frame() {
		let message = ServerMessage::parse(
			r#"{"type":"NOTIFICATION","eventId":"e1","sortId":"s1","occurredAt":"2025-01-01T00:00:00Z",
			"payload":{"notificationType":"comment_like","metadata":{"postId":"p","commentId":"c"}}}"#,
		)
		.unwrap();

		assert!(message.is_notification());
		assert_eq!(message.event_id.as_deref(), Some("e1"));
		assert_eq!(message.notification_type(), NotificationType::CommentLike);

		let item = message.to_item().unwrap();
		assert_eq!(item.event_id, "e1");
		assert_eq!(item.sort_id.as_deref(), Some("s1"));
		assert_eq!(item.occurred_at, "2025-01-01T00:00:00Z");
		assert_eq!(
			item.metadata,
			NotificationMetadata::CommentLike {
				post_id: "p".into(),
				comment_id: "c".into(),
				comment_content: None,
			}
		);
	}

	#[test]
	fn other_frame_types_parse_but_are_not_notifications() {
		let message = ServerMessage::parse(r#"{"type":"RESYNC"}"#).unwrap();
		assert!(!message.is_notification());
		assert_eq!(message.notification_type(), NotificationType::Unknown);
	}

	#[test]
	fn garbage_is_rejected() {
		assert!(ServerMessage::parse("not json").is_err());
		assert!(ServerMessage::parse(r#"{"eventId":"e1"}"#).is_err());
	}

	#[test]
	fn ack_wire_shape() {
		let ack = Ack::new("e42");
		let value: Value = serde_json::from_str(&ack.to_json().unwrap()).unwrap();
		assert_eq!(value, json!({"type": "ACK", "lastReceivedId": "e42"}));
	}
}
