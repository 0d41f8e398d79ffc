//! Realtime notification channel.
//!
//! Keeps one push socket open while the user is signed in:
//!
//! * connects when the [`threadly_auth::CredentialStore`] gains a credential
//!   (or already has one at start),
//! * reconnects after unexpected closes with exponential [`Backoff`],
//! * closes the socket and cancels any pending retry when the credential
//!   disappears or the [`ChannelHandle`] is shut down or dropped,
//! * forwards `NOTIFICATION` frames to a [`NotificationHandler`] and
//!   acknowledges them with their `eventId`.
//!
//! The lifecycle is the pure [`transition`] table over [`ConnectionState`];
//! the driver task only performs the [`Effect`]s it returns.

mod backoff;
mod channel;
mod error;
mod handler;
pub mod message;
mod socket;
mod state;
mod token;

pub use backoff::Backoff;
pub use channel::{ChannelHandle, ChannelOptions, NotificationChannel};
pub use error::{Result, SocketError};
pub use handler::{NoOpNotificationHandler, NotificationHandler, SharedNotificationHandler};
pub use message::{Ack, ServerMessage};
pub use socket::{Connector, Socket, TungsteniteConnector};
pub use state::{ChannelEvent, ConnectionState, Effect, Transition, transition};
pub use token::TokenSource;
