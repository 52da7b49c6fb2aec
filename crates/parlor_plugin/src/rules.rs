#![forbid(unsafe_code)]

use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// A named pattern one positional argument must match.
#[derive(Debug, Clone)]
pub struct ParamPattern {
	pub name: &'static str,
	regex: Regex,
}

impl ParamPattern {
	pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
		Ok(Self {
			name,
			regex: Regex::new(pattern)?,
		})
	}

	pub fn matches(&self, value: &str) -> bool {
		self.regex.is_match(value)
	}
}

/// The validation contract for one command name or alias: minimum argument
/// count, ordered per-argument patterns, and an optional cooldown.
///
/// An absent rule means "no constraints"; the same goes for each individual
/// field here.
#[derive(Debug, Clone, Default)]
pub struct RuleSpec {
	pub min_arg_count: Option<usize>,
	pub params: Vec<ParamPattern>,
	pub cool_down: Option<Duration>,
}

impl RuleSpec {
	pub fn with_min_args(mut self, n: usize) -> Self {
		self.min_arg_count = Some(n);
		self
	}

	pub fn with_param(mut self, name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
		self.params.push(ParamPattern::new(name, pattern)?);
		Ok(self)
	}

	pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
		self.cool_down = Some(cool_down);
		self
	}

	/// Validate a raw parameter string against this rule.
	///
	/// Arguments are whitespace-separated. Patterns validate the arguments
	/// that were provided, in order; how many arguments are required is
	/// governed by `min_arg_count` alone.
	pub fn evaluate(&self, param: &str) -> Result<(), RuleViolation> {
		let args: Vec<&str> = param.split_whitespace().collect();

		if let Some(required) = self.min_arg_count
			&& args.len() < required
		{
			return Err(RuleViolation::NotEnoughArguments {
				required,
				given: args.len(),
			});
		}

		for (pattern, value) in self.params.iter().zip(args.iter()) {
			if !pattern.matches(value) {
				return Err(RuleViolation::InvalidParameter {
					name: pattern.name,
					value: (*value).to_string(),
				});
			}
		}

		Ok(())
	}
}

/// Rule evaluation outcome, naming which parameter failed and why.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleViolation {
	#[error("expected at least {required} argument(s), got {given}")]
	NotEnoughArguments { required: usize, given: usize },

	#[error("invalid value for parameter \"{name}\": {value}")]
	InvalidParameter { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_rule_accepts_anything() {
		let rule = RuleSpec::default();
		assert_eq!(rule.evaluate(""), Ok(()));
		assert_eq!(rule.evaluate("a b c"), Ok(()));
	}

	#[test]
	fn min_arg_count_is_enforced() {
		let rule = RuleSpec::default().with_min_args(2);

		assert_eq!(
			rule.evaluate("only"),
			Err(RuleViolation::NotEnoughArguments { required: 2, given: 1 })
		);
		assert_eq!(rule.evaluate("one two"), Ok(()));
		assert_eq!(rule.evaluate("one two three"), Ok(()));
	}

	#[test]
	fn pattern_mismatch_names_the_parameter() {
		let rule = RuleSpec::default()
			.with_min_args(1)
			.with_param("action", "^(reload|show)$")
			.unwrap();

		assert_eq!(rule.evaluate("reload"), Ok(()));
		assert_eq!(
			rule.evaluate("explode"),
			Err(RuleViolation::InvalidParameter {
				name: "action",
				value: "explode".to_string(),
			})
		);
	}

	#[test]
	fn patterns_only_validate_provided_arguments() {
		let rule = RuleSpec::default().with_param("count", "^[0-9]+$").unwrap();

		assert_eq!(rule.evaluate(""), Ok(()));
		assert_eq!(rule.evaluate("12"), Ok(()));
		assert!(rule.evaluate("twelve").is_err());
	}

	#[test]
	fn invalid_pattern_is_a_construction_error() {
		assert!(RuleSpec::default().with_param("broken", "((").is_err());
	}
}
