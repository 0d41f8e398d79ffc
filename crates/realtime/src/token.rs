use async_trait::async_trait;
use threadly_client::{ApiError, Gateway};

/// Supplies a currently valid access credential for each connect attempt.
#[async_trait]
pub trait TokenSource: Send + Sync {
	async fn access_token(&self) -> Result<Option<String>, ApiError>;
}

#[async_trait]
impl TokenSource for Gateway {
	async fn access_token(&self) -> Result<Option<String>, ApiError> {
		self.ensure_fresh_access_token().await
	}
}
