//! Durable credential persistence.
//!
//! The blob layout is `{ "state": { "tokens": {..} | null }, "version": 0 }`
//! under a fixed storage key, shared with other Threadly clients.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialPair;
use crate::error::{AuthError, AuthResult};

/// Backing storage for the credential store's cold-start fallback.
pub trait CredentialPersistence: Send + Sync {
	/// Read the persisted pair, if any.
	fn load(&self) -> AuthResult<Option<CredentialPair>>;

	/// Replace the persisted pair; `None` records a logged-out state.
	fn save(&self, tokens: Option<&CredentialPair>) -> AuthResult<()>;
}

/// Persistence that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl CredentialPersistence for NoPersistence {
	fn load(&self) -> AuthResult<Option<CredentialPair>> {
		Ok(None)
	}

	fn save(&self, _tokens: Option<&CredentialPair>) -> AuthResult<()> {
		Ok(())
	}
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedBlob {
	#[serde(default)]
	state: PersistedState,
	#[serde(default)]
	version: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
	#[serde(default)]
	tokens: Option<CredentialPair>,
}

/// JSON file persistence.
#[derive(Debug, Clone)]
pub struct FilePersistence {
	path: PathBuf,
}

impl FilePersistence {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_error(&self, error: std::io::Error) -> AuthError {
		AuthError::Io {
			path: self.path.clone(),
			error,
		}
	}
}

impl CredentialPersistence for FilePersistence {
	fn load(&self) -> AuthResult<Option<CredentialPair>> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(self.io_error(e)),
		};
		if content.trim().is_empty() {
			return Ok(None);
		}
		let blob: PersistedBlob = serde_json::from_str(&content)?;
		Ok(blob.state.tokens)
	}

	fn save(&self, tokens: Option<&CredentialPair>) -> AuthResult<()> {
		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
		}

		let blob = PersistedBlob {
			state: PersistedState { tokens: tokens.cloned() },
			version: 0,
		};
		let json = serde_json::to_string_pretty(&blob)?;

		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
		restrict_permissions(&tmp).map_err(|e| self.io_error(e))?;
		fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
	}
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn missing_file_loads_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FilePersistence::new(dir.path().join("threadly-auth.json"));
		assert_eq!(storage.load().unwrap(), None);
	}

	#[test]
	fn save_then_load_preserves_pair() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FilePersistence::new(dir.path().join("nested").join("threadly-auth.json"));
		let pair = CredentialPair::new("access", "refresh");

		storage.save(Some(&pair)).unwrap();
		assert_eq!(storage.load().unwrap(), Some(pair));
	}

	#[test]
	fn blob_uses_shared_layout() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FilePersistence::new(dir.path().join("threadly-auth.json"));
		storage.save(Some(&CredentialPair::new("a", "r"))).unwrap();

		let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
		assert_eq!(
			raw,
			serde_json::json!({"state": {"tokens": {"accessToken": "a", "refreshToken": "r"}}, "version": 0})
		);

		storage.save(None).unwrap();
		let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
		assert_eq!(raw["state"]["tokens"], serde_json::Value::Null);
	}

	#[test]
	fn incomplete_tokens_are_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("threadly-auth.json");
		fs::write(&path, r#"{"state":{"tokens":{"accessToken":"a"}}}"#).unwrap();

		assert!(matches!(FilePersistence::new(path).load(), Err(AuthError::Json(_))));
	}

	#[test]
	fn blob_without_state_loads_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("threadly-auth.json");
		fs::write(&path, "{}").unwrap();

		assert_eq!(FilePersistence::new(path).load().unwrap(), None);
	}
}
