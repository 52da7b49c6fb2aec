#![forbid(unsafe_code)]

use std::sync::Arc;

use parlor_plugin::{
	CommandPlugin, Connection, HandlerError, HookChain, MESSAGE_EVENT, RoomHandle, RoomPlugin, RuleSpec, StoredMessage,
};

/// Turns authored text into a stored and broadcast room message.
///
/// Plain chat lines are dispatched as this command, so the message hook
/// chain is folded here, before the finalized string reaches history and
/// broadcast.
pub struct MessagePlugin {
	room: RoomHandle,
	hooks: Arc<HookChain>,
	rule: RuleSpec,
}

impl MessagePlugin {
	pub fn new(room: RoomHandle, hooks: Arc<HookChain>) -> Self {
		Self {
			room,
			hooks,
			rule: RuleSpec::default().with_min_args(1),
		}
	}
}

#[async_trait::async_trait]
impl CommandPlugin for MessagePlugin {
	fn command_name(&self) -> &'static str {
		"message"
	}

	fn rule_for(&self, _alias: &str) -> Option<&RuleSpec> {
		Some(&self.rule)
	}

	async fn run(&self, _alias: &str, param: &str, connection: &Connection) -> Result<(), HandlerError> {
		let content = self.hooks.apply_message_hooks(Some(&self.room), param.to_string());

		let message = StoredMessage::new(self.room.id(), connection.user().clone(), content);
		let payload =
			serde_json::to_value(&message).map_err(|_| HandlerError::new("failed to encode message"))?;

		self.room.push_history(message).await;
		self.room.broadcast(MESSAGE_EVENT, payload).await;

		Ok(())
	}
}

impl RoomPlugin for MessagePlugin {
	fn room(&self) -> &RoomHandle {
		&self.room
	}
}
