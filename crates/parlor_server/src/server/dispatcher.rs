#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use parlor_domain::UserId;
use parlor_plugin::{CommandPlugin, Connection, ConnectionId, DispatchError, GlobalPlugin, RoomPlugin};
use tracing::debug;

use crate::config::ConfigService;
use crate::server::rate_limit::{RateLimiter, resolve_key};
use crate::server::registry::PluginRegistry;
use crate::server::rooms::RoomDirectory;

/// Who a cooldown applies to: registered users carry their cooldowns
/// across connections, guests are tracked per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ActorKey {
	User(UserId),
	Guest(ConnectionId),
}

impl ActorKey {
	fn for_connection(connection: &Connection) -> Self {
		let user = connection.user();
		if user.id.is_registered() {
			ActorKey::User(user.id)
		} else {
			ActorKey::Guest(connection.id())
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
	actor: ActorKey,
	/// Canonical command name, so aliases share one cooldown.
	command: &'static str,
}

enum ResolvedPlugin {
	Global(Arc<dyn GlobalPlugin>),
	Room(Arc<dyn RoomPlugin>),
}

impl ResolvedPlugin {
	fn as_command(&self) -> &dyn CommandPlugin {
		match self {
			ResolvedPlugin::Global(p) => p.as_ref(),
			ResolvedPlugin::Room(p) => p.as_ref(),
		}
	}
}

/// The registry/router: turns an incoming textual command plus a
/// connection's session state into a validated, rate-limited invocation
/// of exactly one handler.
pub struct CommandDispatcher {
	registry: Arc<PluginRegistry>,
	rooms: Arc<RoomDirectory>,
	rate_limiter: Arc<RateLimiter>,
	config: Arc<ConfigService>,
	cooldowns: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CommandDispatcher {
	pub fn new(
		registry: Arc<PluginRegistry>,
		rooms: Arc<RoomDirectory>,
		rate_limiter: Arc<RateLimiter>,
		config: Arc<ConfigService>,
	) -> Self {
		Self {
			registry,
			rooms,
			rate_limiter,
			config,
			cooldowns: Mutex::new(HashMap::new()),
		}
	}

	/// Handle one raw inbound line end to end.
	///
	/// Every rejected command yields exactly one feedback message to the
	/// issuing connection; nothing here terminates the connection or the
	/// process.
	pub async fn dispatch_line(&self, raw: &str, connection: &Connection) {
		let parsed = match parlor_util::command::parse(raw) {
			Ok(parsed) => parsed,
			Err(reason) => {
				metrics::counter!("parlor_server_commands_rejected_total").increment(1);
				connection.send_system_message(&reason);
				return;
			}
		};

		match self.dispatch(&parsed.name, &parsed.param, connection).await {
			Ok(()) => {
				metrics::counter!("parlor_server_commands_dispatched_total").increment(1);
			}
			Err(err) => {
				metrics::counter!("parlor_server_commands_rejected_total").increment(1);
				if matches!(err, DispatchError::RateLimited) {
					metrics::counter!("parlor_server_commands_rate_limited_total").increment(1);
				}

				debug!(conn_id = %connection.id(), command = %parsed.name, error = %err, "command rejected");
				connection.send_system_message(&err.to_string());
			}
		}
	}

	/// Core dispatch algorithm: resolve scope, validate rules, gate on
	/// permission, cooldown and rate limit, then invoke the handler.
	pub async fn dispatch(&self, name: &str, param: &str, connection: &Connection) -> Result<(), DispatchError> {
		// Room scope shadows global scope for the same command name,
		// enabling per-room command overrides.
		let room = match connection.room_id() {
			Some(id) => self.rooms.get(id).await,
			None => None,
		};

		let resolved = match room.as_ref().and_then(|r| r.resolve_command(name)) {
			Some(plugin) => ResolvedPlugin::Room(plugin),
			None => match self.registry.resolve_global(name) {
				Some(plugin) => ResolvedPlugin::Global(plugin.clone()),
				None => {
					return Err(DispatchError::UnknownCommand {
						command: name.to_string(),
					});
				}
			},
		};

		let plugin = resolved.as_command();

		if let Some(rule) = plugin.rule_for(name) {
			rule.evaluate(param)?;
		}

		let user = connection.user();
		if (plugin.op_only() && !user.is_operator()) || !user.right.satisfies(plugin.min_right()) {
			return Err(DispatchError::Permission {
				command: name.to_string(),
			});
		}

		if !plugin.callable() {
			return Err(DispatchError::NotCallable {
				command: name.to_string(),
			});
		}

		let cool_down = plugin.rule_for(name).and_then(|rule| rule.cool_down);
		let cooldown_key = CooldownKey {
			actor: ActorKey::for_connection(connection),
			command: plugin.command_name(),
		};

		if let Some(cool_down) = cool_down {
			let last = {
				let cooldowns = self.cooldowns.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
				cooldowns.get(&cooldown_key).copied()
			};

			if let Some(last) = last {
				let elapsed = last.elapsed();
				if elapsed < cool_down {
					return Err(DispatchError::Cooldown {
						remaining: cool_down - elapsed,
					});
				}
			}
		}

		if let Some(cost) = plugin.rate_limit_cost() {
			let cfg = self.config.current();
			let key = resolve_key(connection.meta(), cfg.server.trusted_proxy_header.as_deref());

			self.rate_limiter.consume(&key, cost).map_err(|_| DispatchError::RateLimited)?;
		}

		plugin.run(name, param, connection).await?;

		// Only a successful invocation consumes the cooldown; timestamps
		// are monotonic since `Instant::now()` never regresses.
		if cool_down.is_some() {
			let mut cooldowns = self.cooldowns.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
			cooldowns.insert(cooldown_key, Instant::now());
		}

		Ok(())
	}
}

impl core::fmt::Debug for CommandDispatcher {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("CommandDispatcher").finish_non_exhaustive()
	}
}
