#![forbid(unsafe_code)]

pub mod connection;
pub mod error;
pub mod group;
pub mod hooks;
pub mod room;
pub mod rules;

pub use connection::{Connection, ConnectionId, MESSAGE_EVENT, OutboundEvent, RequestMeta, Session};
pub use error::{DispatchError, HandlerError};
pub use group::{GlobalPluginCtor, PluginGroup, RoomPluginCtor};
pub use hooks::HookChain;
pub use room::{RoomHandle, StoredMessage};
pub use rules::{ParamPattern, RuleSpec, RuleViolation};

/// The command-handler capability every plugin implements.
///
/// Metadata accessors describe how the dispatcher gates an invocation;
/// `run` is only ever reached after the rule, permission, cooldown and
/// rate-limit gates have all passed, so handlers never re-validate them.
#[async_trait::async_trait]
pub trait CommandPlugin: Send + Sync + 'static {
	/// Primary command name, unique within the plugin's scope.
	fn command_name(&self) -> &'static str;

	/// Additional names this plugin answers to. Must not collide with any
	/// other plugin's name or alias in the same scope.
	fn aliases(&self) -> &'static [&'static str] {
		&[]
	}

	/// The validation contract for one of this plugin's names. `None`
	/// means "no constraints" for that name.
	fn rule_for(&self, alias: &str) -> Option<&RuleSpec> {
		let _ = alias;
		None
	}

	/// Restrict invocation to operators.
	fn op_only(&self) -> bool {
		false
	}

	/// Minimum privilege level required; negative means no restriction
	/// beyond `op_only`.
	fn min_right(&self) -> i32 {
		-1
	}

	/// Exclude from help/discovery listings. Hidden commands dispatch
	/// identically to visible ones.
	fn hidden(&self) -> bool {
		false
	}

	/// `false` marks a hook-only plugin; direct invocation is an error.
	fn callable(&self) -> bool {
		true
	}

	/// IP-keyed rate-limit cost consumed before each invocation, for
	/// externally triggered actions. `None` skips the rate-limit gate.
	fn rate_limit_cost(&self) -> Option<u32> {
		None
	}

	/// Invocation logic. A [`HandlerError`] is relayed to the connection
	/// as a neutral system message and never crashes the process.
	async fn run(&self, alias: &str, param: &str, connection: &Connection) -> Result<(), HandlerError>;

	/// Primary name plus aliases, in declaration order.
	fn names(&self) -> Vec<&'static str> {
		let mut names = Vec::with_capacity(1 + self.aliases().len());
		names.push(self.command_name());
		names.extend_from_slice(self.aliases());
		names
	}

	fn matches_alias(&self, alias: &str) -> bool {
		self.command_name() == alias || self.aliases().contains(&alias)
	}
}

/// Observes newly established connections, before any command from them is
/// processed. A returned error is logged and skipped, never propagated.
#[async_trait::async_trait]
pub trait ConnectionObserver: Send + Sync {
	async fn on_new_connection(&self, connection: &Connection) -> anyhow::Result<()>;
}

/// Transforms a newly authored message before it is stored and broadcast.
///
/// Pure data transformation: always returns a string, returning the input
/// unchanged being the no-op. Infallible by signature.
pub trait MessageTransformer: Send + Sync {
	fn on_new_message(&self, message: String) -> String;
}

/// A plugin instantiated once per server process.
pub trait GlobalPlugin: CommandPlugin {
	fn connection_observer(&self) -> Option<&dyn ConnectionObserver> {
		None
	}

	fn message_transformer(&self) -> Option<&dyn MessageTransformer> {
		None
	}
}

/// A plugin instantiated once per room, holding a shared back-reference to
/// its owning room.
pub trait RoomPlugin: CommandPlugin {
	fn room(&self) -> &RoomHandle;

	fn message_transformer(&self) -> Option<&dyn MessageTransformer> {
		None
	}
}
