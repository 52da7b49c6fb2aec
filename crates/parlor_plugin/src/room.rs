#![forbid(unsafe_code)]

use core::fmt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use parlor_domain::{MessageId, RoomId, User};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::RoomPlugin;
use crate::connection::{Connection, ConnectionId, MESSAGE_EVENT, OutboundEvent};

/// A finalized message stored in a room's history and broadcast to members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
	pub id: MessageId,
	pub room: RoomId,
	pub author: User,
	pub content: String,
	pub posted_at_ms: i64,
}

impl StoredMessage {
	pub fn new(room: RoomId, author: User, content: impl Into<String>) -> Self {
		Self {
			id: MessageId::new_v4(),
			room,
			author,
			content: content.into(),
			posted_at_ms: parlor_util::time::unix_ms_now(),
		}
	}
}

/// Shared handle to one room instance.
///
/// Room plugins hold this as a back-reference to their owning room; the
/// room registry holds it too. Neither side owns the other exclusively.
#[derive(Clone)]
pub struct RoomHandle {
	inner: Arc<RoomShared>,
}

struct RoomShared {
	id: RoomId,
	name: String,
	history_capacity: usize,
	state: Mutex<RoomState>,
	/// Installed once right after the room's plugins are materialized;
	/// registration is closed afterwards.
	plugins: OnceLock<Vec<Arc<dyn RoomPlugin>>>,
}

#[derive(Default)]
struct RoomState {
	members: HashMap<ConnectionId, mpsc::Sender<OutboundEvent>>,
	history: VecDeque<StoredMessage>,
}

impl RoomHandle {
	pub fn new(id: RoomId, name: impl Into<String>, history_capacity: usize) -> Self {
		Self {
			inner: Arc::new(RoomShared {
				id,
				name: name.into(),
				history_capacity,
				state: Mutex::new(RoomState::default()),
				plugins: OnceLock::new(),
			}),
		}
	}

	pub fn id(&self) -> RoomId {
		self.inner.id
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Attach this room's plugin instances. Called exactly once per room.
	pub fn install_plugins(&self, plugins: Vec<Arc<dyn RoomPlugin>>) {
		if self.inner.plugins.set(plugins).is_err() {
			warn!(room = %self.inner.id, "room plugins already installed; ignoring");
		}
	}

	pub fn plugins(&self) -> &[Arc<dyn RoomPlugin>] {
		self.inner.plugins.get().map(Vec::as_slice).unwrap_or(&[])
	}

	/// Resolve a command name or alias against this room's plugins.
	pub fn resolve_command(&self, alias: &str) -> Option<Arc<dyn RoomPlugin>> {
		self.plugins().iter().find(|p| p.matches_alias(alias)).cloned()
	}

	pub async fn join(&self, connection: &Connection) {
		let mut state = self.inner.state.lock().await;
		state.members.insert(connection.id(), connection.outbound_sender());
	}

	pub async fn leave(&self, id: ConnectionId) {
		let mut state = self.inner.state.lock().await;
		state.members.remove(&id);
	}

	pub async fn member_count(&self) -> usize {
		let state = self.inner.state.lock().await;
		state.members.values().filter(|s| !s.is_closed()).count()
	}

	/// Fan an event out to every member. Closed members are pruned; full
	/// member queues drop the event for that member only.
	pub async fn broadcast(&self, event: &str, payload: serde_json::Value) {
		let mut state = self.inner.state.lock().await;

		let mut dropped: u64 = 0;
		for sender in state.members.values() {
			let item = OutboundEvent {
				event: event.to_string(),
				payload: payload.clone(),
			};
			if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(item) {
				dropped += 1;
			}
		}

		state.members.retain(|_, s| !s.is_closed());

		if dropped > 0 {
			debug!(room = %self.inner.id, dropped, "room broadcast dropped due to full member queues");
		}
	}

	/// Broadcast a neutral system message to every member.
	pub async fn broadcast_system_message(&self, content: &str) {
		self.broadcast(
			MESSAGE_EVENT,
			serde_json::json!({
				"content": content,
				"system": true,
			}),
		)
		.await;
	}

	/// Append a finalized message to the room history, evicting the oldest
	/// entries past capacity. Capacity `0` disables history retention.
	pub async fn push_history(&self, message: StoredMessage) {
		if self.inner.history_capacity == 0 {
			return;
		}

		let mut state = self.inner.state.lock().await;
		state.history.push_back(message);
		while state.history.len() > self.inner.history_capacity {
			state.history.pop_front();
		}
	}

	/// Drop the entire room history, returning how many entries were removed.
	pub async fn clear_history(&self) -> usize {
		let mut state = self.inner.state.lock().await;
		let removed = state.history.len();
		state.history.clear();
		removed
	}

	pub async fn history_snapshot(&self) -> Vec<StoredMessage> {
		let state = self.inner.state.lock().await;
		state.history.iter().cloned().collect()
	}
}

impl fmt::Debug for RoomHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoomHandle")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.finish_non_exhaustive()
	}
}
