#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parlor_domain::User;
use parlor_plugin::{Connection, ConnectionId, HookChain, RequestMeta, RoomHandle, Session};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::dispatcher::CommandDispatcher;

/// Settings for the line-oriented demo listener.
#[derive(Debug, Clone)]
pub struct LineServerConfig {
	/// Per-connection outbound queue capacity.
	pub outbound_queue_capacity: usize,
}

impl Default for LineServerConfig {
	fn default() -> Self {
		Self {
			outbound_queue_capacity: 256,
		}
	}
}

/// Thin line-delimited TCP binding over the command core.
///
/// Each accepted socket becomes a guest connection joined to the lobby
/// room. Inbound lines are dispatched one at a time, so a connection's
/// commands are strictly serialized; outbound events leave as JSON lines.
pub struct LineServer {
	dispatcher: Arc<CommandDispatcher>,
	hooks: Arc<HookChain>,
	lobby: RoomHandle,
	cfg: LineServerConfig,
	next_conn_id: AtomicU64,
}

impl LineServer {
	pub fn new(dispatcher: Arc<CommandDispatcher>, hooks: Arc<HookChain>, lobby: RoomHandle, cfg: LineServerConfig) -> Self {
		Self {
			dispatcher,
			hooks,
			lobby,
			cfg,
			next_conn_id: AtomicU64::new(1),
		}
	}

	/// Accept loop. Runs until the listener fails.
	pub async fn run(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
		let local = listener.local_addr()?;
		info!(%local, "line listener ready");

		loop {
			let (stream, peer) = listener.accept().await?;
			let server = self.clone();

			tokio::spawn(async move {
				server.handle_socket(stream, peer).await;
			});
		}
	}

	async fn handle_socket(&self, stream: TcpStream, peer: SocketAddr) {
		struct ConnectionGaugeGuard;
		impl Drop for ConnectionGaugeGuard {
			fn drop(&mut self) {
				metrics::gauge!("parlor_server_active_connections").decrement(1.0);
			}
		}

		metrics::gauge!("parlor_server_active_connections").increment(1.0);
		let _conn_guard = ConnectionGaugeGuard;

		let conn_id = ConnectionId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));

		let (outbound_tx, mut outbound_rx) = mpsc::channel(self.cfg.outbound_queue_capacity);

		let connection = Connection::new(
			conn_id,
			Session::new(User::guest(format!("guest{conn_id}"))),
			RequestMeta {
				remote_addr: Some(peer),
				headers: Vec::new(),
			},
			outbound_tx,
		);

		let (read_half, mut write_half) = stream.into_split();

		let writer_task = tokio::spawn(async move {
			while let Some(event) = outbound_rx.recv().await {
				let line = match serde_json::to_string(&serde_json::json!({
					"event": event.event,
					"payload": event.payload,
				})) {
					Ok(line) => line,
					Err(e) => {
						warn!(error = %e, "failed to encode outbound event; dropping");
						continue;
					}
				};

				if write_half.write_all(line.as_bytes()).await.is_err() {
					break;
				}
				if write_half.write_all(b"\n").await.is_err() {
					break;
				}
			}
		});

		self.lobby.join(&connection).await;
		connection.set_room(Some(self.lobby.id()));

		// Connection-established hooks run before any command from this
		// connection is processed.
		self.hooks.notify_new_connection(&connection).await;

		info!(conn_id = %conn_id, %peer, "connection established");

		let mut lines = BufReader::new(read_half).lines();
		loop {
			match lines.next_line().await {
				Ok(Some(line)) => {
					if line.trim().is_empty() {
						continue;
					}

					// Awaiting each dispatch serializes this connection's
					// commands; other connections proceed concurrently.
					self.dispatcher.dispatch_line(&line, &connection).await;
				}
				Ok(None) => break,
				Err(e) => {
					debug!(conn_id = %conn_id, error = %e, "read failed; closing connection");
					break;
				}
			}
		}

		self.lobby.leave(conn_id).await;
		writer_task.abort();

		info!(conn_id = %conn_id, "connection closed");
	}
}
