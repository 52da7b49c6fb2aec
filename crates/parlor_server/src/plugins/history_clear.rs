#![forbid(unsafe_code)]

use std::time::Duration;

use parlor_plugin::{CommandPlugin, Connection, HandlerError, RoomHandle, RoomPlugin, RuleSpec};
use tracing::debug;

/// Cooldown shared by `/historyclear` and its alias.
pub const HISTORY_CLEAR_COOL_DOWN: Duration = Duration::from_millis(10_000);

/// Operator-only room history wipe.
pub struct HistoryClearPlugin {
	room: RoomHandle,
	rule: RuleSpec,
}

impl HistoryClearPlugin {
	pub fn new(room: RoomHandle) -> Self {
		Self {
			room,
			rule: RuleSpec::default().with_cool_down(HISTORY_CLEAR_COOL_DOWN),
		}
	}
}

#[async_trait::async_trait]
impl CommandPlugin for HistoryClearPlugin {
	fn command_name(&self) -> &'static str {
		"historyclear"
	}

	fn aliases(&self) -> &'static [&'static str] {
		&["hc"]
	}

	fn rule_for(&self, _alias: &str) -> Option<&RuleSpec> {
		Some(&self.rule)
	}

	fn op_only(&self) -> bool {
		true
	}

	async fn run(&self, _alias: &str, _param: &str, _connection: &Connection) -> Result<(), HandlerError> {
		let removed = self.room.clear_history().await;
		debug!(room = %self.room.id(), removed, "room history cleared");

		self.room.broadcast_system_message("Room history cleared").await;
		Ok(())
	}
}

impl RoomPlugin for HistoryClearPlugin {
	fn room(&self) -> &RoomHandle {
		&self.room
	}
}
