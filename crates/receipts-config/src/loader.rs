//! Multi-file configuration loading.
//!
//! The entry file may carry `include = "file.toml"` or
//! `include = ["a.toml", "b.toml"]`. Included files are merged section by
//! section into the entry file; a section defined in two files is an error,
//! as is including the same file twice. Included files cannot include
//! further files.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a configuration file and the files it includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read.
	visited: HashSet<PathBuf>,
	/// Top-level section name to the file that defined it.
	section_owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_owners: HashMap::new(),
		}
	}

	/// Loads, merges and validates the configuration rooted at `config_path`.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let entry_path = self.resolve_path(config_path.as_ref())?;
		let entry_content = self.read_file(&entry_path).await?;
		let mut merged: toml::Value = toml::from_str(&entry_content)?;

		let includes = take_includes(&mut merged)?;
		if includes.is_empty() {
			return entry_content.parse();
		}

		self.claim_sections(&merged, &entry_path)?;

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let content = self.read_file(&include_path).await?;
			let mut included: toml::Value = toml::from_str(&content)?;

			if !take_includes(&mut included)?.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					include_path.display()
				)));
			}

			self.claim_sections(&included, &include_path)?;
			tracing::debug!(file = %include_path.display(), "Merged included configuration");

			if let (Some(target), toml::Value::Table(source)) = (merged.as_table_mut(), included) {
				target.extend(source);
			}
		}

		let combined = toml::to_string(&merged).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	/// Reads a file once, resolving environment placeholders.
	async fn read_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	/// Records which file owns each top-level section, rejecting duplicates.
	fn claim_sections(&mut self, value: &toml::Value, source: &Path) -> Result<(), ConfigError> {
		let Some(table) = value.as_table() else {
			return Ok(());
		};

		for key in table.keys() {
			if let Some(owner) = self.section_owners.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					owner.display(),
					source.display()
				)));
			}
			self.section_owners.insert(key.clone(), source.to_path_buf());
		}

		Ok(())
	}

	fn resolve_path(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

/// Removes the `include` key from a parsed file and returns its paths.
fn take_includes(value: &mut toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	let Some(include) = value.as_table_mut().and_then(|t| t.remove("include")) else {
		return Ok(Vec::new());
	};

	match include {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("config.toml"),
			r#"
[reader]
id = "single"

[gateway]
primary = "memory"
[gateway.implementations.memory]
"#,
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("config.toml").await.unwrap();
		assert_eq!(config.reader.id, "single");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			r#"
include = ["gateway.toml", "api.toml"]

[reader]
id = "split"
"#,
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("gateway.toml"),
			r#"
[gateway]
primary = "evm_alloy"
[gateway.implementations.evm_alloy]
rpc_url = "http://127.0.0.1:7545"
"#,
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("api.toml"),
			"[api]\nenabled = true\nport = 4000\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.reader.id, "split");
		assert_eq!(config.gateway.primary.as_deref(), Some("evm_alloy"));
		assert_eq!(config.api.unwrap().port, 4000);
	}

	#[tokio::test]
	async fn test_single_string_include() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"gateway.toml\"\n[reader]\nid = \"one\"\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("gateway.toml"), "[gateway]\n").unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap();
		assert_eq!(config.reader.id, "one");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"other.toml\"]\n[reader]\nid = \"a\"\n[gateway]\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("other.toml"), "[reader]\nid = \"b\"\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'reader'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("self.toml"),
			"include = [\"self.toml\"]\n[reader]\nid = \"loop\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_nested_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"a.toml\"]\n[reader]\nid = \"x\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("a.toml"),
			"include = [\"b.toml\"]\n[gateway]\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("b.toml"), "[api]\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Nested include"));
	}

	#[tokio::test]
	async fn test_missing_file() {
		let temp_dir = TempDir::new().unwrap();
		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("absent.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
