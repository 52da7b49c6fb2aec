#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use arc_swap::ArcSwap;
use serde::Deserialize;
use tracing::info;

/// Default config path: `~/.parlor/config.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
	let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
	Ok(home.join(".parlor").join("config.toml"))
}

/// Load the server config from TOML and env overrides.
pub fn load_server_config_from_path(path: &Path) -> anyhow::Result<ServerConfig> {
	let file_cfg = read_toml_if_exists(path)
		.with_context(|| format!("read config from {}", path.display()))?
		.unwrap_or_default();

	let mut cfg = ServerConfig::from_file(file_cfg);

	apply_env_overrides(&mut cfg);

	Ok(cfg)
}

/// Server config (v1).
#[derive(Debug, Clone)]
pub struct ServerConfig {
	/// Message sent to fresh guest connections; `None` disables it.
	pub welcome_message: Option<String>,
	pub server: ServerSettings,
	pub festive: FestiveSettings,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self::from_file(FileConfig::default())
	}
}

/// Server settings loaded by the server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
	/// Bind address (host:port) for the line-oriented listener.
	pub bind: Option<String>,
	/// Optional metrics exporter bind address (host:port).
	pub metrics_bind: Option<String>,
	/// Trusted proxy header used for rate-limit key resolution; `None`
	/// disables header trust entirely.
	pub trusted_proxy_header: Option<String>,
	/// Rate limiting: points available per key and window.
	pub rate_limit_budget: u32,
	/// Rate limiting: window length in seconds.
	pub rate_limit_window_secs: u64,
	/// Per-room history retention; `0` disables retention.
	pub history_capacity: usize,
	/// Per-connection outbound queue capacity.
	pub outbound_queue_capacity: usize,
}

/// Settings for the date-gated festive message hook.
#[derive(Debug, Clone)]
pub struct FestiveSettings {
	pub enabled: bool,
	/// Decorate roughly one in this many messages inside the window.
	pub sample_one_in: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
	welcome_message: Option<String>,

	#[serde(default)]
	server: FileServerSettings,

	#[serde(default)]
	festive: FileFestiveSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileServerSettings {
	bind: Option<String>,
	metrics_bind: Option<String>,
	trusted_proxy_header: Option<String>,
	rate_limit_budget: Option<u32>,
	rate_limit_window_secs: Option<u64>,
	history_capacity: Option<usize>,
	outbound_queue_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileFestiveSettings {
	enabled: Option<bool>,
	sample_one_in: Option<u32>,
}

impl ServerConfig {
	fn from_file(file: FileConfig) -> Self {
		// An explicitly empty trusted_proxy_header disables header trust;
		// an absent one keeps the conventional default.
		let trusted_proxy_header = match file.server.trusted_proxy_header {
			Some(h) if h.trim().is_empty() => None,
			Some(h) => Some(h.trim().to_string()),
			None => Some("x-forwarded-for".to_string()),
		};

		Self {
			welcome_message: file.welcome_message.filter(|s| !s.trim().is_empty()),
			server: ServerSettings {
				bind: file.server.bind.filter(|s| !s.trim().is_empty()),
				metrics_bind: file.server.metrics_bind.filter(|s| !s.trim().is_empty()),
				trusted_proxy_header,
				rate_limit_budget: file.server.rate_limit_budget.unwrap_or(30),
				rate_limit_window_secs: file.server.rate_limit_window_secs.unwrap_or(60),
				history_capacity: file.server.history_capacity.unwrap_or(500),
				outbound_queue_capacity: file.server.outbound_queue_capacity.unwrap_or(256),
			},
			festive: FestiveSettings {
				enabled: file.festive.enabled.unwrap_or(true),
				sample_one_in: file.festive.sample_one_in.unwrap_or(8).max(1),
			},
		}
	}
}

fn parse_env_bool(v: &str) -> Option<bool> {
	match v.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

fn read_toml_if_exists(path: &Path) -> anyhow::Result<Option<FileConfig>> {
	match fs::read_to_string(path) {
		Ok(s) => {
			let cfg: FileConfig = toml::from_str(&s).context("parse TOML")?;
			Ok(Some(cfg))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(anyhow!(e).context("read config file")),
	}
}

fn apply_env_overrides(cfg: &mut ServerConfig) {
	if let Ok(v) = std::env::var("PARLOR_WELCOME_MESSAGE") {
		let v = v.trim().to_string();
		cfg.welcome_message = if v.is_empty() { None } else { Some(v) };
		info!("server config: welcome_message overridden by env");
	}

	if let Ok(v) = std::env::var("PARLOR_BIND") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			cfg.server.bind = Some(v);
			info!("server config: bind overridden by env");
		}
	}

	if let Ok(v) = std::env::var("PARLOR_METRICS_BIND") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			cfg.server.metrics_bind = Some(v);
			info!("server config: metrics_bind overridden by env");
		}
	}

	if let Ok(v) = std::env::var("PARLOR_TRUSTED_PROXY_HEADER") {
		let v = v.trim().to_string();
		cfg.server.trusted_proxy_header = if v.is_empty() { None } else { Some(v) };
		info!("server config: trusted_proxy_header overridden by env");
	}

	if let Ok(v) = std::env::var("PARLOR_RATE_LIMIT_BUDGET")
		&& let Ok(budget) = v.trim().parse::<u32>()
	{
		cfg.server.rate_limit_budget = budget;
		info!(budget, "server config: rate_limit_budget overridden by env");
	}

	if let Ok(v) = std::env::var("PARLOR_RATE_LIMIT_WINDOW_SECS")
		&& let Ok(secs) = v.trim().parse::<u64>()
	{
		cfg.server.rate_limit_window_secs = secs;
		info!(secs, "server config: rate_limit_window_secs overridden by env");
	}

	if let Ok(v) = std::env::var("PARLOR_HISTORY_CAPACITY")
		&& let Ok(capacity) = v.trim().parse::<usize>()
	{
		cfg.server.history_capacity = capacity;
		info!(capacity, "server config: history_capacity overridden by env");
	}

	if let Ok(v) = std::env::var("PARLOR_FESTIVE_ENABLED")
		&& let Some(enabled) = parse_env_bool(&v)
	{
		cfg.festive.enabled = enabled;
		info!(enabled, "server config: festive.enabled overridden by env");
	}
}

/// Process-scoped configuration snapshot with atomic reload.
///
/// Readers take one whole snapshot and never observe a half-updated
/// configuration; reload replaces the snapshot in a single pointer swap.
#[derive(Debug)]
pub struct ConfigService {
	path: Option<PathBuf>,
	snapshot: ArcSwap<ServerConfig>,
}

impl ConfigService {
	/// Load from a config file path. A missing file yields defaults plus
	/// env overrides, same as a later reload would.
	pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
		let cfg = load_server_config_from_path(path)?;
		Ok(Self {
			path: Some(path.to_path_buf()),
			snapshot: ArcSwap::from_pointee(cfg),
		})
	}

	/// Build from an in-memory config, with no backing file to re-read.
	pub fn from_config(cfg: ServerConfig) -> Self {
		Self {
			path: None,
			snapshot: ArcSwap::from_pointee(cfg),
		}
	}

	/// Current snapshot.
	pub fn current(&self) -> Arc<ServerConfig> {
		self.snapshot.load_full()
	}

	/// Re-read the backing file (and env overrides) and swap the snapshot.
	pub fn reload(&self) -> anyhow::Result<()> {
		let Some(path) = self.path.as_deref() else {
			return Ok(());
		};

		let cfg = load_server_config_from_path(path)?;
		self.snapshot.store(Arc::new(cfg));
		info!(path = %path.display(), "configuration reloaded");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_sensible() {
		let cfg = ServerConfig::default();
		assert_eq!(cfg.server.trusted_proxy_header.as_deref(), Some("x-forwarded-for"));
		assert_eq!(cfg.server.rate_limit_budget, 30);
		assert_eq!(cfg.server.history_capacity, 500);
		assert!(cfg.welcome_message.is_none());
	}

	#[test]
	fn empty_trusted_header_disables_header_trust() {
		let file: FileConfig = toml::from_str(
			r#"
			[server]
			trusted_proxy_header = ""
			"#,
		)
		.unwrap();
		let cfg = ServerConfig::from_file(file);
		assert_eq!(cfg.server.trusted_proxy_header, None);
	}

	#[test]
	fn file_settings_override_defaults() {
		let file: FileConfig = toml::from_str(
			r#"
			welcome_message = "hello there"

			[server]
			rate_limit_budget = 5
			history_capacity = 10

			[festive]
			enabled = false
			"#,
		)
		.unwrap();
		let cfg = ServerConfig::from_file(file);
		assert_eq!(cfg.welcome_message.as_deref(), Some("hello there"));
		assert_eq!(cfg.server.rate_limit_budget, 5);
		assert_eq!(cfg.server.history_capacity, 10);
		assert!(!cfg.festive.enabled);
	}

	#[test]
	fn reload_swaps_the_snapshot_atomically() {
		let dir = std::env::temp_dir().join(format!("parlor-config-test-{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("config.toml");

		std::fs::write(&path, "welcome_message = \"before\"\n").unwrap();
		let service = ConfigService::load_from_path(&path).unwrap();
		assert_eq!(service.current().welcome_message.as_deref(), Some("before"));

		std::fs::write(&path, "welcome_message = \"after\"\n").unwrap();
		service.reload().unwrap();
		assert_eq!(service.current().welcome_message.as_deref(), Some("after"));

		let _ = std::fs::remove_dir_all(&dir);
	}
}
