#![forbid(unsafe_code)]

pub mod command {
	/// A raw inbound line split into a command name and its parameter string.
	#[derive(Debug, Clone, PartialEq, Eq)]
	pub struct CommandLine {
		/// Lowercased command name or alias, without the leading `/`.
		pub name: String,
		/// Everything after the name, leading whitespace stripped.
		pub param: String,
	}

	/// Default command a plain text line is dispatched as.
	pub const MESSAGE_COMMAND: &str = "message";

	/// Split a raw inbound line into `(name, param)`.
	///
	/// Lines starting with `/` are explicit command invocations; anything
	/// else is dispatched as the `message` command carrying the whole line.
	pub fn parse(raw: &str) -> Result<CommandLine, String> {
		let raw = raw.trim();
		if raw.is_empty() {
			return Err("empty input".to_string());
		}

		let Some(rest) = raw.strip_prefix('/') else {
			return Ok(CommandLine {
				name: MESSAGE_COMMAND.to_string(),
				param: raw.to_string(),
			});
		};

		let (name, param) = match rest.split_once(char::is_whitespace) {
			Some((name, param)) => (name, param.trim_start()),
			None => (rest, ""),
		};

		if name.is_empty() {
			return Err(format!("missing command name: {raw}"));
		}

		Ok(CommandLine {
			name: name.to_ascii_lowercase(),
			param: param.to_string(),
		})
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn splits_name_and_param() {
			let c = parse("/historyclear  now please").unwrap();
			assert_eq!(c.name, "historyclear");
			assert_eq!(c.param, "now please");
		}

		#[test]
		fn name_is_lowercased() {
			let c = parse("/AdminConfig reload").unwrap();
			assert_eq!(c.name, "adminconfig");
			assert_eq!(c.param, "reload");
		}

		#[test]
		fn bare_command_has_empty_param() {
			let c = parse("/help").unwrap();
			assert_eq!(c.name, "help");
			assert_eq!(c.param, "");
		}

		#[test]
		fn plain_text_becomes_message_command() {
			let c = parse("hello everyone").unwrap();
			assert_eq!(c.name, MESSAGE_COMMAND);
			assert_eq!(c.param, "hello everyone");
		}

		#[test]
		fn rejects_empty_and_bare_slash() {
			assert!(parse("").is_err());
			assert!(parse("   ").is_err());
			assert!(parse("/").is_err());
			assert!(parse("/ param").is_err());
		}

		mod properties {
			use proptest::prelude::*;

			use super::super::{MESSAGE_COMMAND, parse};

			proptest! {
				#[test]
				fn never_panics(raw in ".*") {
					let _ = parse(&raw);
				}

				#[test]
				fn slash_names_come_back_lowercased(name in "[A-Za-z]{1,16}", param in "[ -~]{0,40}") {
					let c = parse(&format!("/{name} {param}")).unwrap();
					prop_assert_eq!(c.name, name.to_ascii_lowercase());
				}

				#[test]
				fn slashless_lines_are_messages(line in "[^/\\s][ -~]{0,40}") {
					let c = parse(&line).unwrap();
					prop_assert_eq!(c.name.as_str(), MESSAGE_COMMAND);
				}
			}
		}
	}
}

pub mod time {
	use std::time::{Duration, SystemTime, UNIX_EPOCH};

	/// Current Unix time in milliseconds.
	#[inline]
	pub fn unix_ms_now() -> i64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or(Duration::from_secs(0))
			.as_millis() as i64
	}
}
