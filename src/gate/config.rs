//! Gate configuration: dependency timeouts plus the rate limit policy used to build the limiter.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, Dependency},
	limiter::{RateLimitPolicy, RateLimiter, WindowAlgorithm},
};

/// Runtime settings for a [`Gate`](crate::gate::Gate).
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
	/// Upper bound for one session lookup, in milliseconds.
	pub resolver_timeout_ms: u64,
	/// Upper bound for one rate limiter call, in milliseconds.
	pub limiter_timeout_ms: u64,
	/// Rate limit applied to every protected call.
	pub rate_limit: RateLimitSettings,
}
impl GateConfig {
	const DEFAULT_LIMITER_TIMEOUT_MS: u64 = 2_000;
	const DEFAULT_RESOLVER_TIMEOUT_MS: u64 = 5_000;

	/// Parses and validates a JSON document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(de)?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_json(&raw)
	}

	/// Checks timeouts and the rate limit policy.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.resolver_timeout_ms == 0 {
			return Err(ConfigError::NonPositiveTimeout {
				dependency: Dependency::SessionResolver,
			});
		}
		if self.limiter_timeout_ms == 0 {
			return Err(ConfigError::NonPositiveTimeout { dependency: Dependency::RateLimiter });
		}

		self.rate_limit.policy().map(|_| ())
	}

	/// Overrides the session lookup timeout.
	pub fn with_resolver_timeout(mut self, timeout: Duration) -> Self {
		self.resolver_timeout_ms = duration_to_millis(timeout);

		self
	}

	/// Overrides the rate limiter timeout.
	pub fn with_limiter_timeout(mut self, timeout: Duration) -> Self {
		self.limiter_timeout_ms = duration_to_millis(timeout);

		self
	}

	/// Overrides the rate limit settings.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Session lookup timeout.
	pub fn resolver_timeout(&self) -> Duration {
		millis_to_duration(self.resolver_timeout_ms)
	}

	/// Rate limiter timeout.
	pub fn limiter_timeout(&self) -> Duration {
		millis_to_duration(self.limiter_timeout_ms)
	}

	/// Builds the in-process limiter described by [`GateConfig::rate_limit`].
	///
	/// Call once at startup and share the result between gates.
	pub fn build_limiter(&self) -> Result<Arc<dyn RateLimiter>, ConfigError> {
		let policy = self.rate_limit.policy()?;

		Ok(self.rate_limit.algorithm.build(policy))
	}
}
impl Default for GateConfig {
	fn default() -> Self {
		Self {
			resolver_timeout_ms: Self::DEFAULT_RESOLVER_TIMEOUT_MS,
			limiter_timeout_ms: Self::DEFAULT_LIMITER_TIMEOUT_MS,
			rate_limit: RateLimitSettings::default(),
		}
	}
}

/// Serializable form of a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSettings {
	/// Counting algorithm.
	pub algorithm: WindowAlgorithm,
	/// Calls admitted per window.
	pub max_requests: u32,
	/// Window length in seconds.
	pub window_secs: u64,
}
impl RateLimitSettings {
	/// Validates the settings into a policy.
	pub fn policy(&self) -> Result<RateLimitPolicy, ConfigError> {
		let window_secs = i64::try_from(self.window_secs).unwrap_or(i64::MAX);

		RateLimitPolicy::new(self.max_requests, Duration::seconds(window_secs))
	}
}
impl Default for RateLimitSettings {
	fn default() -> Self {
		let policy = RateLimitPolicy::default();

		Self {
			algorithm: WindowAlgorithm::default(),
			max_requests: policy.max_requests(),
			window_secs: u64::try_from(policy.window().whole_seconds()).unwrap_or(0),
		}
	}
}

fn duration_to_millis(duration: Duration) -> u64 {
	u64::try_from(duration.whole_milliseconds()).unwrap_or(0)
}

fn millis_to_duration(millis: u64) -> Duration {
	Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = GateConfig::from_json("{}").expect("Empty config should use defaults.");

		assert_eq!(config, GateConfig::default());
		assert_eq!(config.resolver_timeout(), Duration::seconds(5));
		assert_eq!(config.limiter_timeout(), Duration::seconds(2));
		assert_eq!(config.rate_limit.max_requests, 10);
		assert_eq!(config.rate_limit.window_secs, 10);
	}

	#[test]
	fn parse_errors_report_field_paths() {
		let err = GateConfig::from_json(r#"{ "rate_limit": { "max_requests": "ten" } }"#)
			.expect_err("String budgets should be rejected.");

		match err {
			ConfigError::Parse { path, .. } => assert_eq!(path, "rate_limit.max_requests"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn unknown_fields_are_rejected() {
		let err = GateConfig::from_json(r#"{ "limiter_timeout": 10 }"#)
			.expect_err("Unknown fields should be rejected.");

		assert!(matches!(err, ConfigError::Parse { .. }));
	}

	#[test]
	fn validation_rejects_zero_timeouts_and_budgets() {
		assert!(matches!(
			GateConfig::from_json(r#"{ "limiter_timeout_ms": 0 }"#),
			Err(ConfigError::NonPositiveTimeout { dependency: Dependency::RateLimiter })
		));
		assert!(matches!(
			GateConfig::from_json(r#"{ "rate_limit": { "max_requests": 0 } }"#),
			Err(ConfigError::InvalidPolicy { .. })
		));
		assert!(matches!(
			GateConfig::default().with_resolver_timeout(Duration::seconds(-1)).validate(),
			Err(ConfigError::NonPositiveTimeout { dependency: Dependency::SessionResolver })
		));
	}

	#[test]
	fn fixed_window_config_builds_a_working_limiter() {
		let config = GateConfig::from_json(
			r#"{ "rate_limit": { "algorithm": "fixed", "max_requests": 3, "window_secs": 60 } }"#,
		)
		.expect("Fixed window config should parse.");

		assert_eq!(config.rate_limit.algorithm, WindowAlgorithm::Fixed);
		assert!(config.build_limiter().is_ok());
	}
}
