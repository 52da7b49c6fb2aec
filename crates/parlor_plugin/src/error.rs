#![forbid(unsafe_code)]

use std::time::Duration;

use thiserror::Error;

use crate::rules::RuleViolation;

/// Business-logic rejection raised inside a plugin's `run`.
///
/// Carries a user-facing message; the dispatcher relays it to the issuing
/// connection as a neutral system message and never propagates it further.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
	pub message: String,
}

impl HandlerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Everything that can stop a command before or during handler invocation.
///
/// All variants are caught at the dispatcher boundary and converted into
/// exactly one feedback message; none of them terminate the connection or
/// the process. The `Display` text is the user-facing message, which is why
/// [`DispatchError::RateLimited`] deliberately carries no detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
	#[error("{0}")]
	Validation(#[from] RuleViolation),

	#[error("insufficient privilege to use /{command}")]
	Permission { command: String },

	#[error("/{command} cannot be invoked directly")]
	NotCallable { command: String },

	#[error("command is on cooldown for another {} ms", remaining.as_millis())]
	Cooldown { remaining: Duration },

	#[error("unknown command: /{command}")]
	UnknownCommand { command: String },

	#[error("{0}")]
	Handler(#[from] HandlerError),

	#[error("too many requests")]
	RateLimited,
}
