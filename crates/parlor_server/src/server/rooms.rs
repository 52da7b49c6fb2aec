#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parlor_domain::RoomId;
use parlor_plugin::RoomHandle;
use tokio::sync::RwLock;
use tracing::info;

use crate::server::registry::PluginRegistry;

/// Owns the live room instances and creates their plugin singletons.
#[derive(Debug)]
pub struct RoomDirectory {
	registry: Arc<PluginRegistry>,
	history_capacity: usize,
	rooms: RwLock<HashMap<RoomId, RoomHandle>>,
	next_id: AtomicU32,
}

impl RoomDirectory {
	pub fn new(registry: Arc<PluginRegistry>, history_capacity: usize) -> Self {
		Self {
			registry,
			history_capacity,
			rooms: RwLock::new(HashMap::new()),
			next_id: AtomicU32::new(1),
		}
	}

	/// Create a room and materialize its plugin instances.
	///
	/// Room-scope duplicate command detection happens here; for the first
	/// room this runs during bootstrap, so a bad composition aborts
	/// startup rather than surfacing mid-flight.
	pub async fn create_room(&self, name: &str) -> anyhow::Result<RoomHandle> {
		let id = RoomId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let room = RoomHandle::new(id, name, self.history_capacity);

		let plugins = self.registry.materialize_room_plugins(&room)?;
		let plugin_count = plugins.len();
		room.install_plugins(plugins);

		self.rooms.write().await.insert(id, room.clone());

		info!(room = %id, name, plugins = plugin_count, "room created");
		Ok(room)
	}

	pub async fn get(&self, id: RoomId) -> Option<RoomHandle> {
		self.rooms.read().await.get(&id).cloned()
	}

	/// Drop a room from the directory. Its plugin instances go with it
	/// once the last outstanding handle is released.
	pub async fn remove(&self, id: RoomId) -> Option<RoomHandle> {
		let removed = self.rooms.write().await.remove(&id);
		if removed.is_some() {
			info!(room = %id, "room removed");
		}
		removed
	}

	pub async fn room_count(&self) -> usize {
		self.rooms.read().await.len()
	}
}
