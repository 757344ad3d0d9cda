//! Configuration module for the fuel receipt reader.
//!
//! Configuration is loaded from TOML. `${VAR}` and `${VAR:-default}`
//! placeholders are resolved from the environment before parsing, and a
//! top-level `include = ["gateway.toml"]` pulls further sections from other
//! files. Each top-level section may only be defined once across all files.

mod loader;

use receipts_types::{parse_address, VolumeUnit};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Address of the deployed fuel receipt contract.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x22322523620dCa925Cb24890cf184a5224822890";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input; the message is enough.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level reader configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub reader: ReaderConfig,
	pub gateway: GatewayConfig,
	pub api: Option<ApiConfig>,
}

/// Settings of the reader itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaderConfig {
	/// Identifier used in logs and health responses.
	pub id: String,
	/// Upper bound for every individual contract call, in seconds.
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	/// Largest receipt count a load accepts from the contract.
	#[serde(default = "default_max_receipts")]
	pub max_receipts: u64,
	/// Unit used when a caller does not ask for one.
	#[serde(default)]
	pub default_unit: VolumeUnit,
}

fn default_request_timeout_secs() -> u64 {
	30
}

fn default_max_receipts() -> u64 {
	10_000
}

/// Contract gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Wallet provider implementation to use. When unset no provider is
	/// available and every load fails with a provider-unavailable error.
	pub primary: Option<String>,
	/// Address of the receipt contract.
	#[serde(default = "default_contract_address")]
	pub contract_address: String,
	/// Implementation name to raw configuration table.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

fn default_contract_address() -> String {
	DEFAULT_CONTRACT_ADDRESS.to_string()
}

impl GatewayConfig {
	/// Configuration table of the primary provider, if one is selected.
	pub fn primary_implementation(&self) -> Option<(&str, &toml::Value)> {
		let name = self.primary.as_deref()?;
		self.implementations
			.get(name)
			.map(|config| (name, config))
	}
}

/// HTTP API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Reload receipts on this interval while serving; disabled when unset.
	pub refresh_interval_secs: Option<u64>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Resolves `${VAR}` and `${VAR:-default}` placeholders from the environment.
///
/// Inputs above 1 MiB are rejected before the regex runs.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		ConfigLoader::new(base_dir).load_config(file_name).await
	}

	/// Checks cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.reader.id.trim().is_empty() {
			return Err(ConfigError::Validation("Reader ID cannot be empty".into()));
		}
		if !(1..=300).contains(&self.reader.request_timeout_secs) {
			return Err(ConfigError::Validation(format!(
				"request_timeout_secs must be between 1 and 300, got {}",
				self.reader.request_timeout_secs
			)));
		}

		if self.reader.max_receipts == 0 {
			return Err(ConfigError::Validation(
				"max_receipts must be at least 1".into(),
			));
		}

		parse_address(&self.gateway.contract_address).map_err(|e| {
			ConfigError::Validation(format!("Invalid gateway contract_address: {}", e))
		})?;

		if let Some(primary) = &self.gateway.primary {
			if !self.gateway.implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"Primary gateway '{}' not found in implementations",
					primary
				)));
			}
		}

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.refresh_interval_secs == Some(0) {
				return Err(ConfigError::Validation(
					"refresh_interval_secs must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
