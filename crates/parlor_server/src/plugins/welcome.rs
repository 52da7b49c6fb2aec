#![forbid(unsafe_code)]

use std::sync::Arc;

use parlor_plugin::{CommandPlugin, Connection, ConnectionObserver, GlobalPlugin, HandlerError};

use crate::config::ConfigService;

/// Greets fresh guest connections with the configured welcome message.
///
/// Hook-only: it is never directly invocable and exists purely for the
/// connection-established extension point.
pub struct WelcomePlugin {
	config: Arc<ConfigService>,
}

impl WelcomePlugin {
	pub fn new(config: Arc<ConfigService>) -> Self {
		Self { config }
	}
}

#[async_trait::async_trait]
impl CommandPlugin for WelcomePlugin {
	fn command_name(&self) -> &'static str {
		"welcome"
	}

	fn hidden(&self) -> bool {
		true
	}

	fn callable(&self) -> bool {
		false
	}

	async fn run(&self, _alias: &str, _param: &str, _connection: &Connection) -> Result<(), HandlerError> {
		Ok(())
	}
}

#[async_trait::async_trait]
impl ConnectionObserver for WelcomePlugin {
	async fn on_new_connection(&self, connection: &Connection) -> anyhow::Result<()> {
		// Registered users already know the place.
		if connection.user().id.is_registered() {
			return Ok(());
		}

		if let Some(welcome) = self.config.current().welcome_message.as_deref() {
			connection.send_system_message(welcome);
		}

		Ok(())
	}
}

impl GlobalPlugin for WelcomePlugin {
	fn connection_observer(&self) -> Option<&dyn ConnectionObserver> {
		Some(self)
	}
}
