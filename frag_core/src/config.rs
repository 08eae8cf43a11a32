use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::FragError;
use crate::FragResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["frag.toml", ".frag.toml", ".config/frag.toml"];

/// Default location of the pattern source tree, relative to the project root.
pub const DEFAULT_PATTERNS_PATH: &str = "source/_patterns";

/// Default location of the global data directory, relative to the project
/// root.
pub const DEFAULT_DATA_PATH: &str = "source/_data";

/// Configuration loaded from a `frag.toml` file.
///
/// ```toml
/// debug = false
///
/// [paths]
/// patterns = "source/_patterns"
/// data = "source/_data"
///
/// [exclude]
/// patterns = ["*.bak", "drafts/"]
///
/// [pattern_states]
/// atoms-button = "inprogress"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FragConfig {
	/// Emit verbose traces while building.
	#[serde(default)]
	pub debug: bool,
	/// Source locations.
	#[serde(default)]
	pub paths: PathsConfig,
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Deprecated map of pattern partial name to state. Frontmatter `state`
	/// in the pattern's companion markdown file replaces this.
	#[serde(default)]
	pub pattern_states: HashMap<String, String>,
}

/// Source directories, relative to the project root.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
	#[serde(default = "default_patterns_path")]
	pub patterns: PathBuf,
	#[serde(default = "default_data_path")]
	pub data: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			patterns: default_patterns_path(),
			data: default_data_path(),
		}
	}
}

fn default_patterns_path() -> PathBuf {
	PathBuf::from(DEFAULT_PATTERNS_PATH)
}

fn default_data_path() -> PathBuf {
	PathBuf::from(DEFAULT_DATA_PATH)
}

/// Configuration for excluding files and directories from discovery.
///
/// Patterns follow gitignore syntax and are matched relative to the pattern
/// source tree. Supports negation (`!pattern`), directory markers (trailing
/// `/`), and all standard gitignore wildcards.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl FragConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> FragResult<Option<FragConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: FragConfig =
			toml::from_str(&content).map_err(|e| FragError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Load the config at `root`, falling back to defaults when no config
	/// file exists.
	pub fn load_or_default(root: &Path) -> FragResult<FragConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}
}

/// Parse a data file's content into a `serde_json::Value` based on its
/// extension. JSON files accept the relaxed JSON5 grammar.
pub fn parse_data_file(
	content: &str,
	format: &str,
	path_display: &str,
) -> FragResult<serde_json::Value> {
	match format {
		"json" | "json5" => crate::parse_relaxed_json(content).map_err(|reason| FragError::DataFile {
			path: path_display.to_string(),
			reason,
		}),
		"toml" => {
			let value: toml::Value = toml::from_str(content).map_err(|e| FragError::DataFile {
				path: path_display.to_string(),
				reason: e.to_string(),
			})?;
			toml_to_json(value, path_display)
		}
		"yaml" | "yml" => serde_yaml_ng::from_str(content).map_err(|e| FragError::DataFile {
			path: path_display.to_string(),
			reason: e.to_string(),
		}),
		other => Err(FragError::UnsupportedDataFormat(other.to_string())),
	}
}

fn toml_to_json(value: toml::Value, path_display: &str) -> FragResult<serde_json::Value> {
	let json = match value {
		toml::Value::String(s) => serde_json::Value::String(s),
		toml::Value::Integer(i) => serde_json::Value::Number(i.into()),
		toml::Value::Float(f) => {
			serde_json::Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				FragError::DataFile {
					path: path_display.to_string(),
					reason: format!("`{f}` is not a valid JSON number"),
				}
			})?)
		}
		toml::Value::Boolean(b) => serde_json::Value::Bool(b),
		toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
		toml::Value::Array(items) => {
			serde_json::Value::Array(
				items
					.into_iter()
					.map(|item| toml_to_json(item, path_display))
					.collect::<FragResult<_>>()?,
			)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (key, item) in table {
				map.insert(key, toml_to_json(item, path_display)?);
			}
			serde_json::Value::Object(map)
		}
	};

	Ok(json)
}
