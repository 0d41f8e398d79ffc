//! Notification payload mapping.
//!
//! The notification service is loose about field names and types, so the
//! mapping here is tolerant: numbers are accepted where strings are
//! expected, unknown types collapse to [`NotificationType::Unknown`], and
//! missing sub-objects become empty defaults instead of errors.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::unwrap_payload;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
	PostLike,
	CommentAdded,
	CommentLike,
	FollowRequest,
	Follow,
	FollowAccept,
	Unknown,
}

impl NotificationType {
	/// Case-insensitive; anything unrecognized is [`NotificationType::Unknown`].
	pub fn parse(raw: &str) -> Self {
		match raw.to_ascii_uppercase().as_str() {
			"POST_LIKE" => Self::PostLike,
			"COMMENT_ADDED" => Self::CommentAdded,
			"COMMENT_LIKE" => Self::CommentLike,
			"FOLLOW_REQUEST" => Self::FollowRequest,
			"FOLLOW" => Self::Follow,
			"FOLLOW_ACCEPT" => Self::FollowAccept,
			_ => Self::Unknown,
		}
	}

	fn from_value(value: Option<&Value>) -> Self {
		value.and_then(as_text).map_or(Self::Unknown, |raw| Self::parse(&raw))
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::PostLike => "POST_LIKE",
			Self::CommentAdded => "COMMENT_ADDED",
			Self::CommentLike => "COMMENT_LIKE",
			Self::FollowRequest => "FOLLOW_REQUEST",
			Self::Follow => "FOLLOW",
			Self::FollowAccept => "FOLLOW_ACCEPT",
			Self::Unknown => "UNKNOWN",
		}
	}
}

impl fmt::Display for NotificationType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
	pub user_id: String,
	pub nickname: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub profile_image_url: Option<String>,
}

impl ActorProfile {
	fn from_value(value: Option<&Value>) -> Self {
		let Some(object) = value.and_then(Value::as_object) else {
			return Self::default();
		};
		Self {
			user_id: text_or_empty(object, "userId"),
			nickname: text_or_empty(object, "nickname"),
			profile_image_url: text(object, "profileImageUrl"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreview {
	pub title: String,
	pub body: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
}

impl NotificationPreview {
	/// Present only when both title and body are non-empty.
	fn from_value(value: Option<&Value>) -> Option<Self> {
		let object = value?.as_object()?;
		let title = text(object, "title").filter(|s| !s.is_empty())?;
		let body = text(object, "body").filter(|s| !s.is_empty())?;
		Some(Self {
			title,
			body,
			image_url: text(object, "imageUrl"),
		})
	}
}

/// Type-specific detail, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum NotificationMetadata {
	PostLike {
		post_id: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		post_title: Option<String>,
	},
	CommentAdded {
		post_id: String,
		comment_id: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		comment_content: Option<String>,
		#[serde(skip_serializing_if = "Option::is_none")]
		comment_excerpt: Option<String>,
	},
	CommentLike {
		post_id: String,
		comment_id: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		comment_content: Option<String>,
	},
	FollowRequest,
	Follow,
	FollowAccept,
	Unknown,
}

impl NotificationMetadata {
	/// Metadata with no detail for `kind`.
	pub fn empty(kind: NotificationType) -> Self {
		Self::from_object(kind, &Map::new())
	}

	/// The object's own `type` wins over `fallback`.
	fn from_value(value: Option<&Value>, fallback: NotificationType) -> Self {
		match value.and_then(Value::as_object) {
			Some(object) => {
				let kind = match object.get("type").filter(|v| !v.is_null()) {
					Some(raw) => NotificationType::from_value(Some(raw)),
					None => fallback,
				};
				Self::from_object(kind, object)
			}
			None => Self::empty(fallback),
		}
	}

	fn from_object(kind: NotificationType, object: &Map<String, Value>) -> Self {
		match kind {
			NotificationType::PostLike => Self::PostLike {
				post_id: text_or_empty(object, "postId"),
				post_title: text(object, "postTitle"),
			},
			NotificationType::CommentAdded => Self::CommentAdded {
				post_id: text_or_empty(object, "postId"),
				comment_id: text_or_empty(object, "commentId"),
				comment_content: text(object, "commentContent"),
				comment_excerpt: text(object, "commentExcerpt"),
			},
			NotificationType::CommentLike => Self::CommentLike {
				post_id: text_or_empty(object, "postId"),
				comment_id: text_or_empty(object, "commentId"),
				comment_content: text(object, "commentContent"),
			},
			NotificationType::FollowRequest => Self::FollowRequest,
			NotificationType::Follow => Self::Follow,
			NotificationType::FollowAccept => Self::FollowAccept,
			NotificationType::Unknown => Self::Unknown,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
	pub event_id: String,
	pub receiver_id: String,
	pub notification_type: NotificationType,
	/// RFC 3339 timestamp as sent by the server.
	pub occurred_at: String,
	pub is_read: bool,
	pub actor_profile: ActorProfile,
	pub metadata: NotificationMetadata,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub preview: Option<NotificationPreview>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sort_id: Option<String>,
}

impl NotificationItem {
	pub fn from_value(value: &Value) -> Result<Self, ApiError> {
		let object = value
			.as_object()
			.ok_or_else(|| ApiError::malformed("invalid notification payload"))?;

		let notification_type = NotificationType::from_value(
			object
				.get("notificationType")
				.filter(|v| !v.is_null())
				.or_else(|| object.get("type")),
		);
		let metadata = object
			.get("metaData")
			.filter(|v| !v.is_null())
			.or_else(|| object.get("metadata"));

		Ok(Self {
			event_id: text_or_empty(object, "eventId"),
			receiver_id: text_or_empty(object, "receiverId"),
			notification_type,
			occurred_at: text(object, "occurredAt")
				.unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
			is_read: object.get("isRead").is_some_and(truthy),
			actor_profile: ActorProfile::from_value(object.get("actorProfile")),
			metadata: NotificationMetadata::from_value(metadata, notification_type),
			preview: NotificationPreview::from_value(object.get("preview")),
			sort_id: text(object, "sortId"),
		})
	}

	/// One-line English headline and detail.
	pub fn summary(&self) -> (String, String) {
		let actor = if self.actor_profile.nickname.is_empty() {
			"Someone"
		} else {
			self.actor_profile.nickname.as_str()
		};

		match (&self.notification_type, &self.metadata) {
			(NotificationType::PostLike, meta) => {
				let detail = match meta {
					NotificationMetadata::PostLike { post_title: Some(title), .. } => format!("Post: {title}"),
					_ => "Your post has a new like.".to_string(),
				};
				(format!("{actor} liked your post"), detail)
			}
			(NotificationType::CommentAdded, meta) => {
				let detail = match meta {
					NotificationMetadata::CommentAdded {
						comment_excerpt,
						comment_content,
						..
					} => comment_excerpt.clone().or_else(|| comment_content.clone()),
					_ => None,
				};
				(
					format!("{actor} left a comment"),
					detail.unwrap_or_else(|| "Check the new comment.".to_string()),
				)
			}
			(NotificationType::CommentLike, _) => {
				(format!("{actor} liked your comment"), "Your comment has a new like.".to_string())
			}
			(NotificationType::FollowRequest, _) => {
				(format!("{actor} requested to follow you"), "Review the request.".to_string())
			}
			(NotificationType::Follow, _) => (format!("{actor} started following you"), "Say hello to your new follower.".to_string()),
			(NotificationType::FollowAccept, _) => {
				(format!("{actor} accepted your follow request"), "You are now connected.".to_string())
			}
			(NotificationType::Unknown, _) => ("New notification".to_string(), "Open it for details.".to_string()),
		}
	}
}

/// Keyset cursor for the next notification page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationCursor {
	pub timestamp: String,
	pub id: String,
}

impl NotificationCursor {
	pub fn new(timestamp: impl Into<String>, id: impl Into<String>) -> Self {
		Self {
			timestamp: timestamp.into(),
			id: id.into(),
		}
	}

	/// Present only when both parts are present.
	pub fn from_value(value: Option<&Value>) -> Option<Self> {
		let object = value?.as_object()?;
		let timestamp = first_text(object, &["timestamp", "cursorTimestamp", "cursor_timestamp"])?;
		let id = first_text(object, &["id", "cursorId", "cursor_id"])?;
		Some(Self { timestamp, id })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
	pub items: Vec<NotificationItem>,
	pub has_next: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next_cursor: Option<NotificationCursor>,
}

impl NotificationPage {
	/// Map a list response; accepts the body with or without its envelope.
	pub fn from_value(value: Value) -> Result<Self, ApiError> {
		let data = unwrap_payload(value);
		let items = match data.get("items").and_then(Value::as_array) {
			Some(items) => items.iter().map(NotificationItem::from_value).collect::<Result<Vec<_>, _>>()?,
			None => Vec::new(),
		};
		let next_cursor = NotificationCursor::from_value(data.get("nextCursor"));
		let has_next = data.get("hasNext").is_some_and(truthy);

		Ok(Self {
			items,
			has_next,
			next_cursor,
		})
	}
}

/// Scalar rendered as text. Objects, arrays and null are absent.
fn as_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
	object.get(key).and_then(as_text)
}

fn text_or_empty(object: &Map<String, Value>, key: &str) -> String {
	text(object, key).unwrap_or_default()
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
	keys.iter().find_map(|key| text(object, key))
}

fn truthy(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Null => false,
		Value::Array(_) | Value::Object(_) => true,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use serde_json::json;

	use super::*;
	use crate::notifications::NotificationQuery;

	#[rstest]
	#[case("post_like", NotificationType::PostLike)]
	#[case("COMMENT_ADDED", NotificationType::CommentAdded)]
	#[case("Follow_Accept", NotificationType::FollowAccept)]
	#[case("MENTION", NotificationType::Unknown)]
	#[case("", NotificationType::Unknown)]
	fn type_parsing(#[case] raw: &str, #[case] expected: NotificationType) {
		assert_eq!(NotificationType::parse(raw), expected);
	}

	#[test]
	fn full_item_maps() {
		let item = NotificationItem::from_value(&json!({
			"eventId": "evt-1",
			"receiverId": 42,
			"notificationType": "comment_added",
			"occurredAt": "2025-01-01T00:00:00Z",
			"isRead": true,
			"actorProfile": {"userId": 7, "nickname": "mina", "profileImageUrl": "https://img/7.png"},
			"metaData": {"postId": "p1", "commentId": 9, "commentExcerpt": "nice"},
			"preview": {"title": "New comment", "body": "nice"},
			"sortId": "0001"
		}))
		.unwrap();

		assert_eq!(
			item,
			NotificationItem {
				event_id: "evt-1".into(),
				receiver_id: "42".into(),
				notification_type: NotificationType::CommentAdded,
				occurred_at: "2025-01-01T00:00:00Z".into(),
				is_read: true,
				actor_profile: ActorProfile {
					user_id: "7".into(),
					nickname: "mina".into(),
					profile_image_url: Some("https://img/7.png".into()),
				},
				metadata: NotificationMetadata::CommentAdded {
					post_id: "p1".into(),
					comment_id: "9".into(),
					comment_content: None,
					comment_excerpt: Some("nice".into()),
				},
				preview: Some(NotificationPreview {
					title: "New comment".into(),
					body: "nice".into(),
					image_url: None,
				}),
				sort_id: Some("0001".into()),
			}
		);
	}

	#[test]
	fn sparse_item_gets_defaults() {
		let item = NotificationItem::from_value(&json!({"type": "POST_LIKE", "preview": {"title": "only title"}})).unwrap();

		assert_eq!(item.notification_type, NotificationType::PostLike);
		assert_eq!(item.event_id, "");
		assert!(!item.is_read);
		assert_eq!(item.actor_profile, ActorProfile::default());
		assert_eq!(item.metadata, NotificationMetadata::empty(NotificationType::PostLike));
		assert_eq!(item.preview, None);
		assert!(chrono::DateTime::parse_from_rfc3339(&item.occurred_at).is_ok());
	}

	#[test]
	fn metadata_type_overrides_item_type() {
		let item = NotificationItem::from_value(&json!({
			"notificationType": "POST_LIKE",
			"metadata": {"type": "FOLLOW"}
		}))
		.unwrap();
		assert_eq!(item.notification_type, NotificationType::PostLike);
		assert_eq!(item.metadata, NotificationMetadata::Follow);
	}

	#[test]
	fn non_object_item_is_malformed() {
		let error = NotificationItem::from_value(&json!("evt-1")).unwrap_err();
		assert_eq!(error.kind(), crate::error::ErrorKind::MalformedResponse);
	}

	#[rstest]
	#[case::plain(json!({"timestamp": "t", "id": "i"}))]
	#[case::camel(json!({"cursorTimestamp": "t", "cursorId": "i"}))]
	#[case::snake(json!({"cursor_timestamp": "t", "cursor_id": "i"}))]
	fn cursor_spellings(#[case] raw: Value) {
		assert_eq!(NotificationCursor::from_value(Some(&raw)), Some(NotificationCursor::new("t", "i")));
	}

	#[rstest]
	#[case::half(json!({"timestamp": "t", "id": null}))]
	#[case::not_object(json!("t:i"))]
	#[case::null(Value::Null)]
	fn incomplete_cursor_is_absent(#[case] raw: Value) {
		assert_eq!(NotificationCursor::from_value(Some(&raw)), None);
	}

	#[test]
	fn page_has_next_is_the_server_flag() {
		let page = NotificationPage::from_value(json!({
			"success": true,
			"data": {
				"items": [{"eventId": "a", "type": "FOLLOW"}],
				"hasNext": false,
				"nextCursor": {"timestamp": "2025-01-01T00:00:00Z", "id": "a"}
			}
		}))
		.unwrap();
		assert_eq!(page.items.len(), 1);
		assert!(!page.has_next);
		assert_eq!(page.next_cursor, Some(NotificationCursor::new("2025-01-01T00:00:00Z", "a")));
		assert_eq!(NotificationQuery::default().after(&page), None);

		let more = NotificationPage::from_value(json!({
			"items": [],
			"hasNext": true,
			"nextCursor": {"timestamp": "t", "id": "i"}
		}))
		.unwrap();
		assert!(more.has_next);

		let last = NotificationPage::from_value(json!({"items": [], "hasNext": false, "nextCursor": null})).unwrap();
		assert!(!last.has_next);
		assert_eq!(last.next_cursor, None);
	}

	#[test]
	fn summary_uses_metadata() {
		let item = NotificationItem::from_value(&json!({
			"type": "POST_LIKE",
			"actorProfile": {"nickname": "jun"},
			"metadata": {"postTitle": "Hello"}
		}))
		.unwrap();
		assert_eq!(item.summary(), ("jun liked your post".to_string(), "Post: Hello".to_string()));

		let anonymous = NotificationItem::from_value(&json!({"type": "FOLLOW"})).unwrap();
		assert_eq!(anonymous.summary().0, "Someone started following you");
	}

	#[test]
	fn metadata_serializes_tagged() {
		let value = serde_json::to_value(NotificationMetadata::PostLike {
			post_id: "p".into(),
			post_title: None,
		})
		.unwrap();
		assert_eq!(value, json!({"type": "POST_LIKE", "postId": "p"}));
	}
}
