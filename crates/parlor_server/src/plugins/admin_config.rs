#![forbid(unsafe_code)]

use std::sync::Arc;

use parlor_plugin::{CommandPlugin, Connection, GlobalPlugin, HandlerError, RuleSpec};
use tracing::warn;

use crate::config::ConfigService;

/// Operator-only configuration administration.
pub struct AdminConfigPlugin {
	config: Arc<ConfigService>,
	rule: RuleSpec,
}

impl AdminConfigPlugin {
	pub fn new(config: Arc<ConfigService>) -> anyhow::Result<Self> {
		let rule = RuleSpec::default().with_min_args(1).with_param("action", "^(reload|show)$")?;

		Ok(Self { config, rule })
	}
}

#[async_trait::async_trait]
impl CommandPlugin for AdminConfigPlugin {
	fn command_name(&self) -> &'static str {
		"adminconfig"
	}

	fn rule_for(&self, _alias: &str) -> Option<&RuleSpec> {
		Some(&self.rule)
	}

	fn op_only(&self) -> bool {
		true
	}

	async fn run(&self, _alias: &str, param: &str, connection: &Connection) -> Result<(), HandlerError> {
		let action = param.split_whitespace().next().unwrap_or("");

		match action {
			"reload" => {
				if let Err(e) = self.config.reload() {
					warn!(error = %e, "configuration reload failed");
					return Err(HandlerError::new("configuration reload failed"));
				}
				connection.send_system_message("Configuration reloaded");
			}
			"show" => {
				let cfg = self.config.current();
				let summary = format!(
					"welcome_message: {}\ntrusted_proxy_header: {}\nrate_limit: {} per {}s\nhistory_capacity: {}\nfestive: {}",
					cfg.welcome_message.as_deref().unwrap_or("(disabled)"),
					cfg.server.trusted_proxy_header.as_deref().unwrap_or("(disabled)"),
					cfg.server.rate_limit_budget,
					cfg.server.rate_limit_window_secs,
					cfg.server.history_capacity,
					if cfg.festive.enabled { "enabled" } else { "disabled" },
				);
				connection.send_system_message(&summary);
			}
			// The action pattern gate means nothing else reaches here.
			_ => {}
		}

		Ok(())
	}
}

impl GlobalPlugin for AdminConfigPlugin {}
