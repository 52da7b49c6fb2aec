#![forbid(unsafe_code)]

use core::fmt;
use std::net::SocketAddr;
use std::sync::Mutex;

use parlor_domain::{RoomId, User};
use tokio::sync::mpsc;
use tracing::debug;

/// The only event name the command core emits.
pub const MESSAGE_EVENT: &str = "message";

/// Server-local connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The session the transport layer established for a connection.
#[derive(Debug, Clone)]
pub struct Session {
	pub user: User,
}

impl Session {
	pub fn new(user: User) -> Self {
		Self { user }
	}
}

/// Transport-level request facts consumed by rate-limit key resolution:
/// the raw socket address and any forwarded headers.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
	pub remote_addr: Option<SocketAddr>,
	pub headers: Vec<(String, String)>,
}

impl RequestMeta {
	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(k, _)| k.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}
}

/// An event queued for delivery to a connection.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
	pub event: String,
	pub payload: serde_json::Value,
}

/// One live client session as seen by the command core.
///
/// Owned by the transport layer; the dispatcher and plugins only read it
/// and call [`Connection::send`].
#[derive(Debug)]
pub struct Connection {
	id: ConnectionId,
	session: Session,
	room_id: Mutex<Option<RoomId>>,
	meta: RequestMeta,
	outbound: mpsc::Sender<OutboundEvent>,
}

impl Connection {
	pub fn new(id: ConnectionId, session: Session, meta: RequestMeta, outbound: mpsc::Sender<OutboundEvent>) -> Self {
		Self {
			id,
			session,
			room_id: Mutex::new(None),
			meta,
			outbound,
		}
	}

	pub fn id(&self) -> ConnectionId {
		self.id
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn user(&self) -> &User {
		&self.session.user
	}

	pub fn meta(&self) -> &RequestMeta {
		&self.meta
	}

	/// Current room, if any. Global scope has none.
	pub fn room_id(&self) -> Option<RoomId> {
		match self.room_id.lock() {
			Ok(guard) => *guard,
			Err(poisoned) => *poisoned.into_inner(),
		}
	}

	pub fn set_room(&self, room: Option<RoomId>) {
		match self.room_id.lock() {
			Ok(mut guard) => *guard = room,
			Err(poisoned) => *poisoned.into_inner() = room,
		}
	}

	/// Sender handle rooms keep for broadcasting to this connection.
	pub fn outbound_sender(&self) -> mpsc::Sender<OutboundEvent> {
		self.outbound.clone()
	}

	/// Queue an event for delivery.
	///
	/// Sending to a closed connection is a no-op. A full queue drops the
	/// event rather than blocking command processing.
	pub fn send(&self, event: &str, payload: serde_json::Value) {
		let item = OutboundEvent {
			event: event.to_string(),
			payload,
		};

		match self.outbound.try_send(item) {
			Ok(()) => {}
			Err(mpsc::error::TrySendError::Full(_)) => {
				debug!(conn_id = %self.id, event, "outbound queue full; dropping event");
			}
			Err(mpsc::error::TrySendError::Closed(_)) => {}
		}
	}

	/// Queue a neutral system message for this connection alone.
	pub fn send_system_message(&self, content: &str) {
		self.send(
			MESSAGE_EVENT,
			serde_json::json!({
				"content": content,
				"system": true,
			}),
		);
	}
}
