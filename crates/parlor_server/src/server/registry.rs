#![forbid(unsafe_code)]

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use parlor_plugin::{GlobalPlugin, PluginGroup, RoomHandle, RoomPlugin, RoomPluginCtor};
use tracing::info;

/// Which scope a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
	Global,
	Room,
}

impl fmt::Display for CommandScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			CommandScope::Global => "global",
			CommandScope::Room => "room",
		})
	}
}

/// Discovery metadata for one registered command.
#[derive(Debug, Clone)]
pub struct CommandSummary {
	pub name: &'static str,
	pub aliases: &'static [&'static str],
	pub scope: CommandScope,
	pub hidden: bool,
	pub op_only: bool,
	pub min_right: i32,
}

fn summarize(plugin: &dyn parlor_plugin::CommandPlugin, scope: CommandScope) -> CommandSummary {
	CommandSummary {
		name: plugin.command_name(),
		aliases: plugin.aliases(),
		scope,
		hidden: plugin.hidden(),
		op_only: plugin.op_only(),
		min_right: plugin.min_right(),
	}
}

/// The command registry materialized from plugin groups at bootstrap.
///
/// Global plugins are instantiated here exactly once; room plugin
/// constructors are retained and applied per room instance. Registration
/// is closed after bootstrap, which is why duplicate detection happens
/// only here (and at room materialization) and aborts startup.
pub struct PluginRegistry {
	globals: Vec<Arc<dyn GlobalPlugin>>,
	global_index: HashMap<String, usize>,
	room_ctors: Vec<RoomPluginCtor>,
}

impl PluginRegistry {
	/// Consume the enabled groups, in declaration order, into a registry.
	pub fn bootstrap(groups: Vec<PluginGroup>) -> anyhow::Result<Self> {
		let mut globals: Vec<Arc<dyn GlobalPlugin>> = Vec::new();
		let mut global_index: HashMap<String, usize> = HashMap::new();
		let mut room_ctors: Vec<RoomPluginCtor> = Vec::new();

		for group in groups {
			let group_name = group.name();
			let (global_ctors, group_room_ctors) = group.into_parts();

			for ctor in &global_ctors {
				let plugin = ctor()?;

				for name in plugin.names() {
					let key = name.to_ascii_lowercase();
					if global_index.contains_key(&key) {
						bail!("duplicate global command name/alias at bootstrap: {name} (group {group_name})");
					}
					global_index.insert(key, globals.len());
				}

				globals.push(plugin);
			}

			room_ctors.extend(group_room_ctors);
		}

		info!(
			globals = globals.len(),
			room_ctors = room_ctors.len(),
			"plugin registry bootstrapped"
		);

		Ok(Self {
			globals,
			global_index,
			room_ctors,
		})
	}

	/// Resolve a global command name or alias.
	pub fn resolve_global(&self, alias: &str) -> Option<&Arc<dyn GlobalPlugin>> {
		self.global_index
			.get(&alias.to_ascii_lowercase())
			.and_then(|idx| self.globals.get(*idx))
	}

	/// Global plugins in bootstrap order.
	pub fn globals(&self) -> &[Arc<dyn GlobalPlugin>] {
		&self.globals
	}

	/// Instantiate this registry's room plugins for one room, in bootstrap
	/// order, with per-scope duplicate detection.
	pub fn materialize_room_plugins(&self, room: &RoomHandle) -> anyhow::Result<Vec<Arc<dyn RoomPlugin>>> {
		let mut plugins: Vec<Arc<dyn RoomPlugin>> = Vec::with_capacity(self.room_ctors.len());
		let mut seen: HashMap<String, &'static str> = HashMap::new();

		for ctor in &self.room_ctors {
			let plugin = ctor(room.clone())?;

			for name in plugin.names() {
				let key = name.to_ascii_lowercase();
				if let Some(owner) = seen.get(&key) {
					bail!("duplicate room command name/alias: {name} (already owned by /{owner})");
				}
				seen.insert(key, plugin.command_name());
			}

			plugins.push(plugin);
		}

		Ok(plugins)
	}

	/// Discovery listing: global commands plus one room's commands.
	pub fn catalog_with_room(&self, room: &RoomHandle) -> Vec<CommandSummary> {
		let mut out: Vec<CommandSummary> = self
			.globals
			.iter()
			.map(|p| summarize(p.as_ref(), CommandScope::Global))
			.collect();

		out.extend(room.plugins().iter().map(|p| summarize(p.as_ref(), CommandScope::Room)));

		out
	}
}

impl fmt::Debug for PluginRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginRegistry")
			.field("globals", &self.globals.len())
			.field("room_ctors", &self.room_ctors.len())
			.finish()
	}
}
