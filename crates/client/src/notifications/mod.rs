//! Notification REST API on the notification backend.

mod model;

use reqwest::Method;
use serde_json::Value;

pub use model::{
	ActorProfile, NotificationCursor, NotificationItem, NotificationMetadata, NotificationPage, NotificationPreview,
	NotificationType,
};

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::request::{ApiRequest, Backend};

const NOTIFICATIONS_PATH: &str = "/api/notifications";

/// Page size when the caller does not pick one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Parameters for [`NotificationsApi::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQuery {
	pub limit: u32,
	pub cursor: Option<NotificationCursor>,
}

impl Default for NotificationQuery {
	fn default() -> Self {
		Self {
			limit: DEFAULT_PAGE_LIMIT,
			cursor: None,
		}
	}
}

impl NotificationQuery {
	/// Query for the page after `page`, if there is one.
	pub fn after(&self, page: &NotificationPage) -> Option<Self> {
		let cursor = page.next_cursor.clone().filter(|_| page.has_next)?;
		Some(Self {
			limit: self.limit,
			cursor: Some(cursor),
		})
	}
}

/// Borrowed view of a [`Gateway`] scoped to notification endpoints.
pub struct NotificationsApi<'a> {
	gateway: &'a Gateway,
}

impl Gateway {
	pub fn notifications(&self) -> NotificationsApi<'_> {
		NotificationsApi { gateway: self }
	}
}

impl NotificationsApi<'_> {
	pub async fn list(&self, query: &NotificationQuery) -> Result<NotificationPage, ApiError> {
		let mut request = ApiRequest::get(NOTIFICATIONS_PATH)
			.on(Backend::Notification)
			.query("limit", query.limit);
		if let Some(cursor) = &query.cursor {
			request = request
				.query("cursor_timestamp", &cursor.timestamp)
				.query("cursor_id", &cursor.id);
		}
		let body = self.gateway.execute(request).await?;
		NotificationPage::from_value(body)
	}

	pub async fn get(&self, event_id: &str) -> Result<NotificationItem, ApiError> {
		let payload = self.gateway.send(self.request_for(Method::GET, event_id, "")).await?;
		NotificationItem::from_value(&payload)
	}

	pub async fn mark_read(&self, event_id: &str) -> Result<(), ApiError> {
		self.unit(self.request_for(Method::PATCH, event_id, "/read")).await
	}

	pub async fn mark_all_read(&self) -> Result<(), ApiError> {
		self.unit(ApiRequest::patch(format!("{NOTIFICATIONS_PATH}/read-all")).on(Backend::Notification))
			.await
	}

	pub async fn delete(&self, event_id: &str) -> Result<(), ApiError> {
		self.unit(self.request_for(Method::DELETE, event_id, "")).await
	}

	pub async fn delete_all(&self) -> Result<(), ApiError> {
		self.unit(ApiRequest::delete(NOTIFICATIONS_PATH).on(Backend::Notification))
			.await
	}

	fn request_for(&self, method: Method, event_id: &str, suffix: &str) -> ApiRequest {
		let id = urlencoding::encode(event_id);
		ApiRequest::new(method, format!("{NOTIFICATIONS_PATH}/{id}{suffix}")).on(Backend::Notification)
	}

	async fn unit(&self, request: ApiRequest) -> Result<(), ApiError> {
		let _: Value = self.gateway.execute(request).await?;
		Ok(())
	}
}
