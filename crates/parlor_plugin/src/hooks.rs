#![forbid(unsafe_code)]

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::GlobalPlugin;
use crate::connection::Connection;
use crate::room::RoomHandle;

/// The ordered hook pipeline.
///
/// The order is fixed at bootstrap: group declaration order, then the
/// within-group list order. Created empty and installed once after the
/// global plugins have been materialized, since room plugins constructed by
/// the same groups need the chain before globals exist.
#[derive(Default)]
pub struct HookChain {
	globals: OnceLock<Vec<Arc<dyn GlobalPlugin>>>,
}

impl std::fmt::Debug for HookChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HookChain")
			.field("globals", &self.globals().len())
			.finish()
	}
}

impl HookChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Install the global plugin list. Registration is closed after
	/// bootstrap; a second install is ignored.
	pub fn install_globals(&self, plugins: Vec<Arc<dyn GlobalPlugin>>) {
		if self.globals.set(plugins).is_err() {
			warn!("hook chain globals already installed; ignoring");
		}
	}

	pub fn globals(&self) -> &[Arc<dyn GlobalPlugin>] {
		self.globals.get().map(Vec::as_slice).unwrap_or(&[])
	}

	/// Connection-established extension point. Runs every global plugin's
	/// observer once, before the connection can submit any command.
	///
	/// An observer that fails only loses its own side effect; subsequent
	/// observers still run.
	pub async fn notify_new_connection(&self, connection: &Connection) {
		for plugin in self.globals() {
			let Some(observer) = plugin.connection_observer() else {
				continue;
			};

			if let Err(e) = observer.on_new_connection(connection).await {
				warn!(
					plugin = plugin.command_name(),
					conn_id = %connection.id(),
					error = %e,
					"connection hook failed; skipping"
				);
			}
		}
	}

	/// Message-transform extension point: a left-to-right fold where each
	/// transformer receives the previous output. Global transformers run
	/// first, then the authoring room's, so exactly one finalized string
	/// reaches storage and broadcast.
	pub fn apply_message_hooks(&self, room: Option<&RoomHandle>, message: String) -> String {
		let mut message = message;

		for plugin in self.globals() {
			if let Some(transformer) = plugin.message_transformer() {
				message = transformer.on_new_message(message);
			}
		}

		if let Some(room) = room {
			for plugin in room.plugins() {
				if let Some(transformer) = plugin.message_transformer() {
					message = transformer.on_new_message(message);
				}
			}
		}

		message
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use parlor_domain::User;
	use tokio::sync::mpsc;

	use super::*;
	use crate::connection::{Connection, ConnectionId, OutboundEvent, RequestMeta, Session};
	use crate::error::HandlerError;
	use crate::{CommandPlugin, ConnectionObserver, MessageTransformer};

	struct TagPlugin {
		tag: &'static str,
	}

	#[async_trait::async_trait]
	impl CommandPlugin for TagPlugin {
		fn command_name(&self) -> &'static str {
			"tag"
		}

		fn callable(&self) -> bool {
			false
		}

		async fn run(&self, _alias: &str, _param: &str, _connection: &Connection) -> Result<(), HandlerError> {
			Ok(())
		}
	}

	impl MessageTransformer for TagPlugin {
		fn on_new_message(&self, message: String) -> String {
			format!("{}({message})", self.tag)
		}
	}

	impl GlobalPlugin for TagPlugin {
		fn message_transformer(&self) -> Option<&dyn MessageTransformer> {
			Some(self)
		}
	}

	struct FlakyObserver {
		calls: Arc<AtomicUsize>,
		fail: bool,
	}

	#[async_trait::async_trait]
	impl CommandPlugin for FlakyObserver {
		fn command_name(&self) -> &'static str {
			"flaky"
		}

		fn callable(&self) -> bool {
			false
		}

		async fn run(&self, _alias: &str, _param: &str, _connection: &Connection) -> Result<(), HandlerError> {
			Ok(())
		}
	}

	#[async_trait::async_trait]
	impl ConnectionObserver for FlakyObserver {
		async fn on_new_connection(&self, _connection: &Connection) -> anyhow::Result<()> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				anyhow::bail!("observer exploded");
			}
			Ok(())
		}
	}

	impl GlobalPlugin for FlakyObserver {
		fn connection_observer(&self) -> Option<&dyn ConnectionObserver> {
			Some(self)
		}
	}

	fn guest_connection() -> (Connection, mpsc::Receiver<OutboundEvent>) {
		let (tx, rx) = mpsc::channel(16);
		let conn = Connection::new(
			ConnectionId(1),
			Session::new(User::guest("visitor")),
			RequestMeta::default(),
			tx,
		);
		(conn, rx)
	}

	#[test]
	fn message_hooks_fold_left_to_right() {
		let chain = HookChain::new();
		chain.install_globals(vec![
			Arc::new(TagPlugin { tag: "h1" }),
			Arc::new(TagPlugin { tag: "h2" }),
			Arc::new(TagPlugin { tag: "h3" }),
		]);

		// H3(H2(H1(m)))
		assert_eq!(chain.apply_message_hooks(None, "m".to_string()), "h3(h2(h1(m)))");
	}

	#[test]
	fn empty_chain_returns_input_unchanged() {
		let chain = HookChain::new();
		assert_eq!(chain.apply_message_hooks(None, "hello".to_string()), "hello");
	}

	#[tokio::test]
	async fn failing_observer_does_not_stop_later_observers() {
		let first = Arc::new(AtomicUsize::new(0));
		let second = Arc::new(AtomicUsize::new(0));

		let chain = HookChain::new();
		chain.install_globals(vec![
			Arc::new(FlakyObserver {
				calls: first.clone(),
				fail: true,
			}),
			Arc::new(FlakyObserver {
				calls: second.clone(),
				fail: false,
			}),
		]);

		let (conn, _rx) = guest_connection();
		chain.notify_new_connection(&conn).await;

		assert_eq!(first.load(Ordering::SeqCst), 1);
		assert_eq!(second.load(Ordering::SeqCst), 1);
	}
}
