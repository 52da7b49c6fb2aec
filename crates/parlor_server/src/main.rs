#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use parlor_server::config::{ConfigService, default_config_path};
use parlor_server::plugins::{core_plugin_group, room_plugin_group};
use parlor_server::server::dispatcher::CommandDispatcher;
use parlor_server::server::listener::{LineServer, LineServerConfig};
use parlor_server::server::rate_limit::{RateLimiter, RateLimiterConfig};
use parlor_server::server::registry::PluginRegistry;
use parlor_server::server::rooms::RoomDirectory;

const DEFAULT_BIND: &str = "127.0.0.1:2440";

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: parlor_server [--bind host:port]\n\
\n\
Options:\n\
\t--bind    Bind address (default: {DEFAULT_BIND})\n\
\t--help   Show this help\n\
"
	);
	std::process::exit(2)
}

fn parse_args() -> Option<String> {
	let mut bind: Option<String> = None;

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--bind" | "--listen" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--bind must be non-empty (expected host:port)");
					usage_and_exit();
				}
				bind = Some(v);
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	bind
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,parlor_server=debug".to_string());

	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::new(filter))
		.with(tracing_subscriber::fmt::layer().with_target(false))
		.init();
}

fn init_metrics(bind: Option<&str>) {
	let Some(bind) = bind else {
		return;
	};

	match bind.parse::<SocketAddr>() {
		Ok(addr) => {
			if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
				.with_http_listener(addr)
				.install()
			{
				warn!(error = %e, "failed to start metrics exporter");
			} else {
				info!(%addr, "metrics exporter listening");
			}
		}
		Err(e) => {
			warn!(error = %e, %bind, "invalid metrics bind address (expected host:port)");
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();

	let arg_bind = parse_args();

	let config_path = default_config_path()?;
	let config = Arc::new(ConfigService::load_from_path(&config_path)?);
	info!(path = %config_path.display(), "loaded server config (toml + env overrides)");

	let cfg = config.current();
	init_metrics(cfg.server.metrics_bind.as_deref());

	let hooks = Arc::new(parlor_plugin::HookChain::new());
	let catalog = Arc::new(OnceLock::new());

	let groups = vec![
		core_plugin_group(config.clone(), catalog.clone()),
		room_plugin_group(hooks.clone()),
	];

	// Duplicate command names in either scope abort startup here.
	let registry = Arc::new(PluginRegistry::bootstrap(groups)?);
	hooks.install_globals(registry.globals().to_vec());

	let rooms = Arc::new(RoomDirectory::new(registry.clone(), cfg.server.history_capacity));
	let lobby = rooms.create_room("lobby").await?;

	if catalog.set(registry.catalog_with_room(&lobby)).is_err() {
		warn!("command catalog already installed");
	}

	let rate_limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
		budget: cfg.server.rate_limit_budget,
		window: Duration::from_secs(cfg.server.rate_limit_window_secs),
		..RateLimiterConfig::default()
	}));

	let dispatcher = Arc::new(CommandDispatcher::new(
		registry.clone(),
		rooms.clone(),
		rate_limiter,
		config.clone(),
	));

	let bind = arg_bind
		.or_else(|| cfg.server.bind.clone())
		.unwrap_or_else(|| DEFAULT_BIND.to_string());
	let addr: SocketAddr = bind.parse().map_err(|e| anyhow::anyhow!("invalid bind address {bind}: {e}"))?;

	let listener = TcpListener::bind(addr).await?;
	info!(%addr, "parlor_server listening");

	let server = Arc::new(LineServer::new(
		dispatcher,
		hooks,
		lobby,
		LineServerConfig {
			outbound_queue_capacity: cfg.server.outbound_queue_capacity,
		},
	));

	server.run(listener).await
}
