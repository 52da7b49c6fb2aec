#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
	#[error("invalid format: {0}")]
	InvalidFormat(String),
}

/// Numeric user identifier. Id `0` is reserved for guest sessions;
/// registered users always have a positive id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
	/// The shared guest identity.
	pub const GUEST: UserId = UserId(0);

	pub fn is_registered(self) -> bool {
		self.0 > 0
	}

	pub fn is_guest(self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A user's privilege level. Higher is more privileged; levels at or above
/// [`PrivilegeLevel::OPERATOR`] satisfy operator-only gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeLevel(pub i32);

impl PrivilegeLevel {
	/// Default level for guests and fresh accounts.
	pub const NONE: PrivilegeLevel = PrivilegeLevel(0);

	/// Threshold at which a user counts as an operator.
	pub const OPERATOR: PrivilegeLevel = PrivilegeLevel(4);

	pub fn is_operator(self) -> bool {
		self >= Self::OPERATOR
	}

	/// Whether this level satisfies a command's minimum-right gate.
	/// A negative `min_right` means "no restriction".
	pub fn satisfies(self, min_right: i32) -> bool {
		min_right < 0 || self.0 >= min_right
	}
}

impl fmt::Display for PrivilegeLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The user attached to a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub name: String,
	pub right: PrivilegeLevel,
}

impl User {
	/// A guest user (id `0`, no privileges).
	pub fn guest(name: impl Into<String>) -> Self {
		Self {
			id: UserId::GUEST,
			name: name.into(),
			right: PrivilegeLevel::NONE,
		}
	}

	pub fn registered(id: i64, name: impl Into<String>, right: PrivilegeLevel) -> Self {
		Self {
			id: UserId(id),
			name: name.into(),
			right,
		}
	}

	pub fn is_operator(&self) -> bool {
		self.right.is_operator()
	}
}

/// Numeric room identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for RoomId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}
		s.parse::<u32>()
			.map(RoomId)
			.map_err(|_| ParseIdError::InvalidFormat(format!("expected numeric room id, got: {s}")))
	}
}

/// Server-assigned message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub uuid::Uuid);

impl MessageId {
	/// Create a new random message id.
	pub fn new_v4() -> Self {
		Self(uuid::Uuid::new_v4())
	}
}

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guest_and_registered_ids() {
		assert!(UserId::GUEST.is_guest());
		assert!(!UserId::GUEST.is_registered());
		assert!(UserId(7).is_registered());
		assert!(!UserId(7).is_guest());
	}

	#[test]
	fn operator_threshold() {
		assert!(PrivilegeLevel::OPERATOR.is_operator());
		assert!(PrivilegeLevel(9).is_operator());
		assert!(!PrivilegeLevel(3).is_operator());
	}

	#[test]
	fn negative_min_right_means_unrestricted() {
		assert!(PrivilegeLevel::NONE.satisfies(-1));
		assert!(PrivilegeLevel::NONE.satisfies(0));
		assert!(!PrivilegeLevel::NONE.satisfies(1));
		assert!(PrivilegeLevel(2).satisfies(2));
	}

	#[test]
	fn room_id_parse() {
		assert_eq!("42".parse::<RoomId>().unwrap(), RoomId(42));
		assert_eq!("".parse::<RoomId>().unwrap_err(), ParseIdError::Empty);
		assert!(matches!("lobby".parse::<RoomId>().unwrap_err(), ParseIdError::InvalidFormat(_)));
	}

	#[test]
	fn guest_user_has_no_privileges() {
		let u = User::guest("visitor");
		assert!(u.id.is_guest());
		assert!(!u.is_operator());
	}
}
