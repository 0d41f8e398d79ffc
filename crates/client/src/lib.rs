//! Threadly API client.
//!
//! [`Gateway`] is the entry point: it attaches the stored access credential,
//! checks the response envelope, normalizes every failure into [`ApiError`]
//! and transparently recovers from credential expiry with a single-flight
//! reissue shared by all concurrent callers.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use threadly_auth::CredentialStore;
//! use threadly_client::{Gateway, NotificationQuery};
//! use threadly_config::ClientConfig;
//!
//! let endpoints = ClientConfig::default().endpoints()?;
//! let gateway = Gateway::new(&endpoints, CredentialStore::in_memory());
//! gateway.login("me@example.com", "secret").await?;
//! let page = gateway.notifications().list(&NotificationQuery::default()).await?;
//! println!("{} notifications", page.items.len());
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod error;
mod gateway;
pub mod notifications;
pub mod redact;
mod request;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;

pub use error::{ApiError, ErrorKind, NETWORK_UNAVAILABLE_MESSAGE};
pub use gateway::{Gateway, LOGIN_PATH, LOGOUT_PATH, REFRESH_TOKEN_HEADER, REGISTER_PATH, REISSUE_PATH, Registration};
pub use notifications::{
	DEFAULT_PAGE_LIMIT, NotificationCursor, NotificationItem, NotificationPage, NotificationQuery, NotificationType,
	NotificationsApi,
};
pub use request::{ApiRequest, Backend};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
