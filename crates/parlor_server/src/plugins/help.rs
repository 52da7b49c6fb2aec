#![forbid(unsafe_code)]

use std::sync::{Arc, OnceLock};

use parlor_plugin::{CommandPlugin, Connection, GlobalPlugin, HandlerError};

use crate::server::registry::CommandSummary;

/// Lists the visible commands of both scopes.
///
/// The catalog is late-bound: plugins exist before the registry that
/// indexes them, so the host installs the finished listing right after
/// bootstrap.
pub struct HelpPlugin {
	catalog: Arc<OnceLock<Vec<CommandSummary>>>,
}

impl HelpPlugin {
	pub fn new(catalog: Arc<OnceLock<Vec<CommandSummary>>>) -> Self {
		Self { catalog }
	}
}

fn render_entry(entry: &CommandSummary) -> String {
	let mut line = format!("  /{}", entry.name);

	for alias in entry.aliases {
		line.push_str(&format!(" (alias /{alias})"));
	}

	line.push_str(&format!(" [{}]", entry.scope));

	if entry.op_only {
		line.push_str(" [op]");
	} else if entry.min_right >= 0 {
		line.push_str(&format!(" [right >= {}]", entry.min_right));
	}

	line
}

#[async_trait::async_trait]
impl CommandPlugin for HelpPlugin {
	fn command_name(&self) -> &'static str {
		"help"
	}

	async fn run(&self, _alias: &str, _param: &str, connection: &Connection) -> Result<(), HandlerError> {
		let Some(entries) = self.catalog.get() else {
			return Err(HandlerError::new("command catalog is not ready yet"));
		};

		let mut lines = vec!["Available commands:".to_string()];
		lines.extend(entries.iter().filter(|e| !e.hidden).map(render_entry));

		connection.send_system_message(&lines.join("\n"));
		Ok(())
	}
}

impl GlobalPlugin for HelpPlugin {}
