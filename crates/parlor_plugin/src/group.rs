#![forbid(unsafe_code)]

use core::fmt;
use std::sync::Arc;

use crate::room::RoomHandle;
use crate::{GlobalPlugin, RoomPlugin};

/// Constructor for a server-wide plugin instance.
pub type GlobalPluginCtor = Box<dyn Fn() -> anyhow::Result<Arc<dyn GlobalPlugin>> + Send + Sync>;

/// Constructor for a per-room plugin instance, handed its owning room.
pub type RoomPluginCtor = Box<dyn Fn(RoomHandle) -> anyhow::Result<Arc<dyn RoomPlugin>> + Send + Sync>;

/// A pure composition record: which global- and room-scoped plugins belong
/// together as one feature set.
///
/// Groups carry no runtime state. They are consumed once at bootstrap, in
/// declaration order, to materialize plugin instances per server / per room;
/// that order also fixes the hook-chain order.
pub struct PluginGroup {
	name: &'static str,
	globals: Vec<GlobalPluginCtor>,
	rooms: Vec<RoomPluginCtor>,
}

impl PluginGroup {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			globals: Vec::new(),
			rooms: Vec::new(),
		}
	}

	pub fn with_global(mut self, ctor: impl Fn() -> anyhow::Result<Arc<dyn GlobalPlugin>> + Send + Sync + 'static) -> Self {
		self.globals.push(Box::new(ctor));
		self
	}

	pub fn with_room(
		mut self,
		ctor: impl Fn(RoomHandle) -> anyhow::Result<Arc<dyn RoomPlugin>> + Send + Sync + 'static,
	) -> Self {
		self.rooms.push(Box::new(ctor));
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn globals(&self) -> &[GlobalPluginCtor] {
		&self.globals
	}

	pub fn rooms(&self) -> &[RoomPluginCtor] {
		&self.rooms
	}

	/// Consume the group into its constructor lists, for bootstrap.
	pub fn into_parts(self) -> (Vec<GlobalPluginCtor>, Vec<RoomPluginCtor>) {
		(self.globals, self.rooms)
	}
}

impl fmt::Debug for PluginGroup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginGroup")
			.field("name", &self.name)
			.field("globals", &self.globals.len())
			.field("rooms", &self.rooms.len())
			.finish()
	}
}
