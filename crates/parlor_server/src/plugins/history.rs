#![forbid(unsafe_code)]

use parlor_plugin::{CommandPlugin, Connection, HandlerError, RoomHandle, RoomPlugin};

/// Number of entries `/history` shows at most.
const HISTORY_VIEW_LIMIT: usize = 10;

/// Privileged view of the room's recent history.
pub struct HistoryPlugin {
	room: RoomHandle,
}

impl HistoryPlugin {
	pub fn new(room: RoomHandle) -> Self {
		Self { room }
	}
}

#[async_trait::async_trait]
impl CommandPlugin for HistoryPlugin {
	fn command_name(&self) -> &'static str {
		"history"
	}

	fn min_right(&self) -> i32 {
		1
	}

	async fn run(&self, _alias: &str, _param: &str, connection: &Connection) -> Result<(), HandlerError> {
		let history = self.room.history_snapshot().await;

		if history.is_empty() {
			connection.send_system_message("Room history is empty");
			return Ok(());
		}

		let tail = history.len().saturating_sub(HISTORY_VIEW_LIMIT);
		let mut lines = vec![format!("Last {} of {} message(s):", history.len() - tail, history.len())];
		lines.extend(history[tail..].iter().map(|m| format!("  {}: {}", m.author.name, m.content)));

		connection.send_system_message(&lines.join("\n"));
		Ok(())
	}
}

impl RoomPlugin for HistoryPlugin {
	fn room(&self) -> &RoomHandle {
		&self.room
	}
}
