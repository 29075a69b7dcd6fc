//! Pipeline configuration.
//!
//! Configuration is written in TOML; every field is optional:
//!
//! ```toml
//! quiet-period-ms = 2000
//! event-buffer = 256
//! text-encoding = "utf-8"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use regen_primitives::TextEncoding;
use serde::Deserialize;
use thiserror::Error;

/// Default debounce before a scheduled run starts.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(2);

/// Default capacity of the regeneration event broadcast.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or field types.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Encoding names accepted in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum EncodingName {
	#[default]
	#[serde(rename = "utf-8")]
	Utf8,
	#[serde(rename = "utf-8-bom")]
	Utf8WithBom,
}

impl From<EncodingName> for TextEncoding {
	fn from(name: EncodingName) -> Self {
		match name {
			EncodingName::Utf8 => TextEncoding::Utf8,
			EncodingName::Utf8WithBom => TextEncoding::Utf8WithBom,
		}
	}
}

/// Runtime settings for [`crate::BackgroundGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct GeneratorConfig {
	/// Quiet period in milliseconds; restarted by every enqueue.
	pub quiet_period_ms: u64,
	/// Capacity of the regeneration event broadcast.
	pub event_buffer: usize,
	/// Encoding tagged onto text produced for consumers.
	pub text_encoding: EncodingName,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			quiet_period_ms: millis_saturating(DEFAULT_QUIET_PERIOD),
			event_buffer: DEFAULT_EVENT_BUFFER,
			text_encoding: EncodingName::default(),
		}
	}
}

impl GeneratorConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	/// Checks value ranges that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.event_buffer == 0 {
			return Err(ConfigError::Invalid("event-buffer must be > 0".to_string()));
		}
		Ok(())
	}

	/// Sets the quiet period.
	#[must_use]
	pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
		self.quiet_period_ms = millis_saturating(quiet_period);
		self
	}

	pub fn quiet_period(&self) -> Duration {
		Duration::from_millis(self.quiet_period_ms)
	}

	pub fn encoding(&self) -> TextEncoding {
		self.text_encoding.into()
	}
}

fn millis_saturating(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
