//! Connection lifecycle as a pure transition table.

use std::fmt;

/// Realtime connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
	/// No credential has been seen yet.
	#[default]
	Idle,
	/// Fetching a credential or opening the socket.
	Connecting,
	/// Socket open.
	Connected,
	/// Waiting out the backoff delay.
	Reconnecting,
	/// Signed out or shut down; no socket, no timer.
	Closed,
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Idle => "idle",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Reconnecting => "reconnecting",
			Self::Closed => "closed",
		})
	}
}

/// Inputs to the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
	/// The credential store went from absent to present.
	CredentialPresent,
	/// The credential store went from present to absent.
	CredentialLost,
	Opened,
	OpenFailed,
	/// No access credential could be obtained.
	TokenUnavailable,
	/// The open socket closed or errored.
	SocketClosed,
	BackoffElapsed,
	Shutdown,
}

/// Side effects requested by a transition, performed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
	/// Obtain a credential and open a socket, closing any previous one first.
	Connect,
	ResetBackoff,
	NotifyConnected,
	NotifyDisconnected,
	ScheduleReconnect,
	CancelReconnect,
	CloseSocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
	pub next: ConnectionState,
	pub effects: &'static [Effect],
}

const fn to(next: ConnectionState, effects: &'static [Effect]) -> Option<Transition> {
	Some(Transition { next, effects })
}

/// Next state and effects for `event` in `state`, or `None` when the pair
/// is not a legal transition.
pub fn transition(state: ConnectionState, event: ChannelEvent) -> Option<Transition> {
	use ChannelEvent as E;
	use ConnectionState as S;
	use Effect::*;

	match (state, event) {
		(S::Closed, E::Shutdown | E::CredentialLost) => None,
		(_, E::Shutdown | E::CredentialLost) => to(S::Closed, &[CancelReconnect, CloseSocket]),

		(S::Idle | S::Closed, E::CredentialPresent) => to(S::Connecting, &[Connect]),

		(S::Connecting, E::Opened) => to(S::Connected, &[ResetBackoff, NotifyConnected]),
		(S::Connecting, E::OpenFailed) => to(S::Reconnecting, &[NotifyDisconnected, ScheduleReconnect]),
		(S::Connecting, E::TokenUnavailable) => to(S::Reconnecting, &[ScheduleReconnect]),

		(S::Connected, E::SocketClosed) => to(S::Reconnecting, &[CloseSocket, NotifyDisconnected, ScheduleReconnect]),

		(S::Reconnecting, E::BackoffElapsed) => to(S::Connecting, &[Connect]),

		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::ChannelEvent as E;
	use super::ConnectionState as S;
	use super::Effect::*;
	use super::*;

	fn next(state: ConnectionState, event: ChannelEvent) -> Option<ConnectionState> {
		transition(state, event).map(|t| t.next)
	}

	#[rstest]
	#[case(S::Idle, E::CredentialPresent, S::Connecting)]
	#[case(S::Connecting, E::Opened, S::Connected)]
	#[case(S::Connected, E::SocketClosed, S::Reconnecting)]
	#[case(S::Reconnecting, E::BackoffElapsed, S::Connecting)]
	#[case(S::Connecting, E::OpenFailed, S::Reconnecting)]
	#[case(S::Connecting, E::TokenUnavailable, S::Reconnecting)]
	#[case(S::Closed, E::CredentialPresent, S::Connecting)]
	fn lifecycle_edges(#[case] from: ConnectionState, #[case] event: ChannelEvent, #[case] to: ConnectionState) {
		assert_eq!(next(from, event), Some(to));
	}

	#[rstest]
	fn every_live_state_closes(
		#[values(S::Idle, S::Connecting, S::Connected, S::Reconnecting)] from: ConnectionState,
		#[values(E::Shutdown, E::CredentialLost)] event: ChannelEvent,
	) {
		let transition = transition(from, event).unwrap();
		assert_eq!(transition.next, S::Closed);
		assert_eq!(transition.effects, &[CancelReconnect, CloseSocket]);
	}

	#[rstest]
	#[case(S::Closed, E::Shutdown)]
	#[case(S::Closed, E::SocketClosed)]
	#[case(S::Connected, E::CredentialPresent)]
	#[case(S::Connected, E::Opened)]
	#[case(S::Reconnecting, E::SocketClosed)]
	#[case(S::Idle, E::BackoffElapsed)]
	#[case(S::Connected, E::BackoffElapsed)]
	fn illegal_pairs_are_ignored(#[case] from: ConnectionState, #[case] event: ChannelEvent) {
		assert_eq!(transition(from, event), None);
	}

	#[test]
	fn open_resets_backoff_before_notifying() {
		assert_eq!(transition(S::Connecting, E::Opened).unwrap().effects, &[ResetBackoff, NotifyConnected]);
	}

	#[test]
	fn unexpected_close_tears_down_before_rescheduling() {
		assert_eq!(
			transition(S::Connected, E::SocketClosed).unwrap().effects,
			&[CloseSocket, NotifyDisconnected, ScheduleReconnect]
		);
	}
}
