#![forbid(unsafe_code)]

pub mod admin_config;
pub mod festive;
pub mod help;
pub mod history;
pub mod history_clear;
pub mod message;
pub mod welcome;


use std::sync::{Arc, OnceLock};

use parlor_plugin::{GlobalPlugin, HookChain, PluginGroup, RoomPlugin};

use crate::config::ConfigService;
use crate::plugins::admin_config::AdminConfigPlugin;
use crate::plugins::festive::FestivePlugin;
use crate::plugins::help::HelpPlugin;
use crate::plugins::history::HistoryPlugin;
use crate::plugins::history_clear::HistoryClearPlugin;
use crate::plugins::message::MessagePlugin;
use crate::plugins::welcome::WelcomePlugin;
use crate::server::registry::CommandSummary;

/// Server-wide feature set: discovery, administration and the
/// connection/message hooks.
pub fn core_plugin_group(config: Arc<ConfigService>, catalog: Arc<OnceLock<Vec<CommandSummary>>>) -> PluginGroup {
	PluginGroup::new("core")
		.with_global({
			let catalog = catalog.clone();
			move || Ok(Arc::new(HelpPlugin::new(catalog.clone())) as Arc<dyn GlobalPlugin>)
		})
		.with_global({
			let config = config.clone();
			move || Ok(Arc::new(AdminConfigPlugin::new(config.clone())?) as Arc<dyn GlobalPlugin>)
		})
		.with_global({
			let config = config.clone();
			move || Ok(Arc::new(WelcomePlugin::new(config.clone())) as Arc<dyn GlobalPlugin>)
		})
		.with_global({
			let config = config.clone();
			move || Ok(Arc::new(FestivePlugin::new(config.clone())) as Arc<dyn GlobalPlugin>)
		})
}

/// Per-room feature set: messaging and history management.
pub fn room_plugin_group(hooks: Arc<HookChain>) -> PluginGroup {
	PluginGroup::new("rooms")
		.with_room({
			let hooks = hooks.clone();
			move |room| Ok(Arc::new(MessagePlugin::new(room, hooks.clone())) as Arc<dyn RoomPlugin>)
		})
		.with_room(|room| Ok(Arc::new(HistoryPlugin::new(room)) as Arc<dyn RoomPlugin>))
		.with_room(|room| Ok(Arc::new(HistoryClearPlugin::new(room)) as Arc<dyn RoomPlugin>))
}
