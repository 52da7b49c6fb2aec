#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use parlor_plugin::RequestMeta;
use thiserror::Error;

/// The one error the rate limiter ever returns.
///
/// Insufficient budget and internal faults fail identically so callers
/// (and the clients behind them) cannot distinguish "rate limited" from
/// "limiter broken" and probe the key space.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("too many requests")]
pub struct RateLimitRejected;

/// Settings for one protected operation class.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
	/// Points available per key within one window.
	pub budget: u32,
	pub window: Duration,
	/// Bound on tracked keys; the map is cleared when exceeded.
	pub max_keys: usize,
}

impl Default for RateLimiterConfig {
	fn default() -> Self {
		Self {
			budget: 30,
			window: Duration::from_secs(60),
			max_keys: 1024,
		}
	}
}

/// Resolve a caller's identity key from transport request facts.
///
/// Prefers the first entry of the configured trusted proxy header
/// (case-insensitive lookup), then the raw socket address, then
/// `"unknown"`.
pub fn resolve_key(meta: &RequestMeta, trusted_header: Option<&str>) -> String {
	if let Some(header_name) = trusted_header.filter(|h| !h.trim().is_empty())
		&& let Some(value) = meta.header(header_name)
	{
		let first = value.split(',').next().unwrap_or("").trim();
		if !first.is_empty() {
			return first.to_string();
		}
	}

	if let Some(addr) = meta.remote_addr {
		return addr.ip().to_string();
	}

	"unknown".to_string()
}

#[derive(Debug, Clone, Copy)]
struct WindowSlot {
	window_start: Instant,
	used: u32,
}

/// Fixed-window consumption tracker keyed by caller identity.
#[derive(Debug)]
pub struct RateLimiter {
	cfg: RateLimiterConfig,
	slots: Mutex<HashMap<String, WindowSlot>>,
}

impl RateLimiter {
	pub fn new(cfg: RateLimiterConfig) -> Self {
		Self {
			cfg,
			slots: Mutex::new(HashMap::new()),
		}
	}

	/// Withdraw `cost` points from `key`'s budget for the current window.
	///
	/// Fails uniformly with [`RateLimitRejected`] on insufficient budget
	/// and on any internal fault.
	pub fn consume(&self, key: &str, cost: u32) -> Result<(), RateLimitRejected> {
		let mut slots = self.slots.lock().map_err(|_| RateLimitRejected)?;

		let now = Instant::now();

		if slots.len() >= self.cfg.max_keys && !slots.contains_key(key) {
			slots.clear();
		}

		let slot = slots.entry(key.to_string()).or_insert(WindowSlot {
			window_start: now,
			used: 0,
		});

		if now.duration_since(slot.window_start) >= self.cfg.window {
			*slot = WindowSlot {
				window_start: now,
				used: 0,
			};
		}

		let next = slot.used.checked_add(cost).ok_or(RateLimitRejected)?;
		if next > self.cfg.budget {
			return Err(RateLimitRejected);
		}

		slot.used = next;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::net::SocketAddr;
	use std::sync::Arc;

	use super::*;

	fn meta_with(addr: Option<&str>, headers: &[(&str, &str)]) -> RequestMeta {
		RequestMeta {
			remote_addr: addr.map(|a| a.parse::<SocketAddr>().expect("valid addr")),
			headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
		}
	}

	#[test]
	fn trusted_header_takes_first_list_entry() {
		let meta = meta_with(Some("9.9.9.9:1234"), &[("X-Forwarded-For", "1.2.3.4, 5.6.7.8")]);
		assert_eq!(resolve_key(&meta, Some("x-forwarded-for")), "1.2.3.4");
	}

	#[test]
	fn absent_header_falls_back_to_socket_address() {
		let meta = meta_with(Some("9.9.9.9:1234"), &[]);
		assert_eq!(resolve_key(&meta, Some("x-forwarded-for")), "9.9.9.9");
	}

	#[test]
	fn unconfigured_header_ignores_forwarded_value() {
		let meta = meta_with(Some("9.9.9.9:1234"), &[("x-forwarded-for", "1.2.3.4")]);
		assert_eq!(resolve_key(&meta, None), "9.9.9.9");
	}

	#[test]
	fn no_address_at_all_resolves_unknown() {
		let meta = meta_with(None, &[]);
		assert_eq!(resolve_key(&meta, Some("x-forwarded-for")), "unknown");
	}

	#[test]
	fn budget_exhaustion_fails_the_final_consumption() {
		let limiter = RateLimiter::new(RateLimiterConfig {
			budget: 3,
			window: Duration::from_secs(60),
			max_keys: 16,
		});

		for _ in 0..3 {
			assert_eq!(limiter.consume("k", 1), Ok(()));
		}
		assert_eq!(limiter.consume("k", 1), Err(RateLimitRejected));

		// Other keys keep their own budget.
		assert_eq!(limiter.consume("other", 1), Ok(()));
	}

	#[tokio::test]
	async fn window_expiry_refills_the_budget() {
		let limiter = RateLimiter::new(RateLimiterConfig {
			budget: 1,
			window: Duration::from_millis(40),
			max_keys: 16,
		});

		assert_eq!(limiter.consume("k", 1), Ok(()));
		assert_eq!(limiter.consume("k", 1), Err(RateLimitRejected));

		tokio::time::sleep(Duration::from_millis(60)).await;

		assert_eq!(limiter.consume("k", 1), Ok(()));
	}

	#[test]
	fn internal_fault_is_indistinguishable_from_rate_limiting() {
		let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
			budget: 1,
			window: Duration::from_secs(60),
			max_keys: 16,
		}));

		limiter.consume("k", 1).unwrap();
		let budget_err = limiter.consume("k", 1).unwrap_err();

		// Poison the slot map to simulate an internal limiter fault.
		let poisoner = limiter.clone();
		let _ = std::thread::spawn(move || {
			let _guard = poisoner.slots.lock().unwrap();
			panic!("injected fault");
		})
		.join();

		let fault_err = limiter.consume("fresh-key", 1).unwrap_err();
		assert_eq!(budget_err, fault_err);
	}
}
