#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use chrono::{Datelike, NaiveDate, Utc};
use parlor_plugin::{CommandPlugin, Connection, GlobalPlugin, HandlerError, MessageTransformer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ConfigService;

/// Date source, injectable so tests can pin the calendar.
pub trait Clock: Send + Sync {
	fn today(&self) -> NaiveDate;
}

/// Wall-clock UTC date.
pub struct SystemClock;

impl Clock for SystemClock {
	fn today(&self) -> NaiveDate {
		Utc::now().date_naive()
	}
}

/// Seasonal easter egg: inside the festive window, a sampled fraction of
/// messages gets a snowflake appended. Hook-only.
pub struct FestivePlugin {
	config: Arc<ConfigService>,
	clock: Box<dyn Clock>,
	rng: Mutex<StdRng>,
}

impl FestivePlugin {
	pub fn new(config: Arc<ConfigService>) -> Self {
		Self::with_sources(config, Box::new(SystemClock), StdRng::from_os_rng())
	}

	/// Construct with explicit clock and RNG, for deterministic tests.
	pub fn with_sources(config: Arc<ConfigService>, clock: Box<dyn Clock>, rng: StdRng) -> Self {
		Self {
			config,
			clock,
			rng: Mutex::new(rng),
		}
	}

	/// December 19th through 27th, inclusive.
	fn in_window(date: NaiveDate) -> bool {
		date.month() == 12 && (19..=27).contains(&date.day())
	}
}

#[async_trait::async_trait]
impl CommandPlugin for FestivePlugin {
	fn command_name(&self) -> &'static str {
		"festive"
	}

	fn hidden(&self) -> bool {
		true
	}

	fn callable(&self) -> bool {
		false
	}

	async fn run(&self, _alias: &str, _param: &str, _connection: &Connection) -> Result<(), HandlerError> {
		Ok(())
	}
}

impl MessageTransformer for FestivePlugin {
	fn on_new_message(&self, message: String) -> String {
		let cfg = self.config.current();
		if !cfg.festive.enabled || !Self::in_window(self.clock.today()) {
			return message;
		}

		let sampled = {
			let mut rng = match self.rng.lock() {
				Ok(rng) => rng,
				Err(_) => return message,
			};
			rng.random_range(0..cfg.festive.sample_one_in.max(1)) == 0
		};

		if sampled { format!("{message} ❄") } else { message }
	}
}

impl GlobalPlugin for FestivePlugin {
	fn message_transformer(&self) -> Option<&dyn MessageTransformer> {
		Some(self)
	}
}
