//! Credentials for the Threadly client.
//!
//! This crate owns the [`CredentialPair`] value and the [`CredentialStore`]
//! that both the request gateway and the realtime channel read from.
//!
//! # Lifecycle
//!
//! 1. Login (or a successful reissue) produces a pair; [`CredentialStore::set`]
//!    replaces whatever was there.
//! 2. Every write goes through to the persisted blob, which is read back only
//!    on cold start.
//! 3. Logout or an unrecoverable reissue failure calls
//!    [`CredentialStore::clear`].
//!
//! The current [`SessionId`] is published on a `tokio::sync::watch` channel
//! so long-lived consumers can connect on login and tear down on logout.

mod claims;
mod credentials;
mod error;
mod storage;
mod store;

pub use claims::{AccessClaims, decode_access_claims};
pub use credentials::CredentialPair;
pub use error::{AuthError, AuthResult};
pub use storage::{CredentialPersistence, FilePersistence, NoPersistence};
pub use store::{CredentialStore, SessionId};
