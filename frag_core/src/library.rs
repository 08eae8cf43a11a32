use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;
use serde_json::Value;

use crate::EngineSet;
use crate::ForwardLineage;
use crate::FragConfig;
use crate::FragError;
use crate::FragResult;
use crate::FrontmatterParser;
use crate::LineageRecorder;
use crate::MarkdownFrontmatter;
use crate::PseudopatternFinder;
use crate::Registry;
use crate::SiblingVariants;
use crate::build_list_items;
use crate::config::parse_data_file;
use crate::merge_data;
use crate::resolve_data_links;

/// Label used for diagnostics about the global data.
pub const GLOBAL_DATA_LABEL: &str = "data";

/// The kind of a recoverable problem found while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum DiagnosticKind {
	/// A JSON, list-item or markdown file could not be parsed.
	MalformedData { reason: String },
	/// A partial reference matched no fragment.
	UnresolvedPartial { name: String },
	/// A `link.*` token matched no fragment.
	UnresolvedLink { token: String },
	/// A deprecated configuration path was used.
	DeprecatedConfig { message: String },
	/// A fragment includes itself, directly or transitively.
	CyclicReference { chain: Vec<String> },
	/// A file could not be read for a reason other than not existing.
	Io { reason: String },
}

/// A recoverable problem attached to the file it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostic {
	/// Relative path of the affected file, or [`GLOBAL_DATA_LABEL`].
	pub rel_path: String,
	pub kind: DiagnosticKind,
}

/// Which diagnostics a caller treats as build failures. Nothing escalates
/// by default.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct EscalationOptions {
	pub malformed_data: bool,
	pub unresolved_references: bool,
	pub deprecated_config: bool,
	/// Cyclic references and read failures.
	pub failures: bool,
}

impl EscalationOptions {
	/// Escalate every diagnostic.
	pub fn strict() -> Self {
		Self {
			malformed_data: true,
			unresolved_references: true,
			deprecated_config: true,
			failures: true,
		}
	}
}

impl BuildDiagnostic {
	pub fn new(rel_path: impl Into<String>, kind: DiagnosticKind) -> Self {
		Self {
			rel_path: rel_path.into(),
			kind,
		}
	}

	/// Check whether this diagnostic should fail the build under `options`.
	pub fn is_error(&self, options: &EscalationOptions) -> bool {
		match &self.kind {
			DiagnosticKind::MalformedData { .. } => options.malformed_data,
			DiagnosticKind::UnresolvedPartial { .. } | DiagnosticKind::UnresolvedLink { .. } => {
				options.unresolved_references
			}
			DiagnosticKind::DeprecatedConfig { .. } => options.deprecated_config,
			DiagnosticKind::CyclicReference { .. } | DiagnosticKind::Io { .. } => options.failures,
		}
	}

	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::MalformedData { reason } => format!("malformed data: {reason}"),
			DiagnosticKind::UnresolvedPartial { name } => {
				format!("could not find pattern with partial `{name}`")
			}
			DiagnosticKind::UnresolvedLink { token } => format!("unresolved data link `{token}`"),
			DiagnosticKind::DeprecatedConfig { message } => message.clone(),
			DiagnosticKind::CyclicReference { chain } => {
				format!("cyclic partial reference: {}", chain.join(" -> "))
			}
			DiagnosticKind::Io { reason } => format!("read failed: {reason}"),
		}
	}
}

/// The state of one pattern library build: configuration, engines, the
/// fragment registry and the collaborators used by each stage.
///
/// Stages must run in order. [`Library::build`] does so:
///
/// 1. global data is loaded;
/// 2. every source file is discovered;
/// 3. `link.*` tokens in all data are resolved;
/// 4. every fragment is expanded.
#[derive(Debug)]
pub struct Library {
	/// Project root that config paths are relative to.
	pub root: PathBuf,
	pub config: FragConfig,
	pub engines: EngineSet,
	pub registry: Registry,
	/// Recoverable problems found so far, in the order they were found.
	pub diagnostics: Vec<BuildDiagnostic>,
	pub(crate) frontmatter: Box<dyn FrontmatterParser>,
	pub(crate) lineage: Box<dyn LineageRecorder>,
	pub(crate) pseudopatterns: Box<dyn PseudopatternFinder>,
	pub(crate) deprecation_warned: bool,
}

impl Library {
	pub fn new(root: impl Into<PathBuf>, config: FragConfig) -> Self {
		Self {
			root: root.into(),
			config,
			engines: EngineSet::default(),
			registry: Registry::new(),
			diagnostics: Vec::new(),
			frontmatter: Box::new(MarkdownFrontmatter),
			lineage: Box::new(ForwardLineage),
			pseudopatterns: Box::new(SiblingVariants),
			deprecation_warned: false,
		}
	}

	/// Create a library for `root`, reading `frag.toml` when present.
	pub fn load(root: impl Into<PathBuf>) -> FragResult<Self> {
		let root = root.into();
		let config = FragConfig::load_or_default(&root)?;
		Ok(Self::new(root, config))
	}

	#[must_use]
	pub fn with_engines(mut self, engines: EngineSet) -> Self {
		self.engines = engines;
		self
	}

	#[must_use]
	pub fn with_frontmatter(mut self, parser: Box<dyn FrontmatterParser>) -> Self {
		self.frontmatter = parser;
		self
	}

	#[must_use]
	pub fn with_lineage(mut self, recorder: Box<dyn LineageRecorder>) -> Self {
		self.lineage = recorder;
		self
	}

	#[must_use]
	pub fn with_pseudopatterns(mut self, finder: Box<dyn PseudopatternFinder>) -> Self {
		self.pseudopatterns = finder;
		self
	}

	pub fn patterns_root(&self) -> PathBuf {
		self.root.join(&self.config.paths.patterns)
	}

	pub fn data_root(&self) -> PathBuf {
		self.root.join(&self.config.paths.data)
	}

	/// Run the full pipeline over the pattern source tree.
	pub fn build(&mut self) -> FragResult<()> {
		self.load_global_data();

		let files = self.collect_pattern_files()?;
		tracing::debug!("discovering {} file(s)", files.len());
		for rel_path in &files {
			self.process_pattern_iterative(rel_path);
		}

		self.parse_data_links();
		self.expand_all();

		Ok(())
	}

	/// Diagnostics that escalate under `options`.
	pub fn errors(&self, options: &EscalationOptions) -> Vec<&BuildDiagnostic> {
		self.diagnostics
			.iter()
			.filter(|diagnostic| diagnostic.is_error(options))
			.collect()
	}

	pub(crate) fn record(&mut self, rel_path: &str, kind: DiagnosticKind) {
		self.diagnostics.push(BuildDiagnostic::new(rel_path, kind));
	}

	/// Read every data file in the data directory into the registry's global
	/// data. Files are merged in name order; a file named `listitems.*`
	/// instead becomes the global list items.
	pub fn load_global_data(&mut self) {
		let data_root = self.data_root();
		let entries = match std::fs::read_dir(&data_root) {
			Ok(entries) => entries,
			Err(e) => {
				if e.kind() == std::io::ErrorKind::NotFound {
					tracing::debug!("no global data directory at {}", data_root.display());
				} else {
					tracing::warn!("could not read {}: {e}", data_root.display());
					self.record(GLOBAL_DATA_LABEL, DiagnosticKind::Io {
						reason: e.to_string(),
					});
				}
				return;
			}
		};

		let mut files: Vec<PathBuf> = entries
			.filter_map(Result::ok)
			.map(|entry| entry.path())
			.filter(|path| path.is_file())
			.collect();
		files.sort();

		for path in files {
			let path_display = path.display().to_string();
			let format = path
				.extension()
				.and_then(|ext| ext.to_str())
				.unwrap_or_default()
				.to_ascii_lowercase();
			let content = match std::fs::read_to_string(&path) {
				Ok(content) => content,
				Err(e) => {
					tracing::warn!("could not read {path_display}: {e}");
					self.record(GLOBAL_DATA_LABEL, DiagnosticKind::Io {
						reason: e.to_string(),
					});
					continue;
				}
			};

			let value = match parse_data_file(&content, &format, &path_display) {
				Ok(value) => value,
				Err(FragError::UnsupportedDataFormat(_)) => {
					tracing::debug!("skipping {path_display}: not a data file");
					continue;
				}
				Err(e) => {
					tracing::warn!("there was an error parsing global data: {e}");
					self.record(GLOBAL_DATA_LABEL, DiagnosticKind::MalformedData {
						reason: e.to_string(),
					});
					continue;
				}
			};

			let is_list_items = path
				.file_stem()
				.and_then(|stem| stem.to_str())
				.is_some_and(|stem| stem == "listitems");
			if is_list_items {
				match value {
					Value::Object(items) => self.registry.list_items = Some(build_list_items(items)),
					_ => {
						tracing::warn!("{path_display} must contain an object of list items");
						self.record(GLOBAL_DATA_LABEL, DiagnosticKind::MalformedData {
							reason: format!("{path_display} must contain an object"),
						});
					}
				}
			} else {
				self.registry.data = merge_data(&self.registry.data, &value);
			}
		}
	}

	/// Rewrite `link.*` tokens in the global data and in every fragment's
	/// local data. Must run after discovery so the link table is complete.
	pub fn parse_data_links(&mut self) {
		let resolution = resolve_data_links(&self.registry.data, self.registry.links());
		self.report_unresolved_links(GLOBAL_DATA_LABEL, &resolution.unresolved);
		self.registry.data = resolution.value;

		for index in 0..self.registry.len() {
			let Some(fragment) = self.registry.get(index) else {
				continue;
			};
			let rel_path = fragment.rel_path.clone();
			let resolution = resolve_data_links(&fragment.data, self.registry.links());
			self.report_unresolved_links(&rel_path, &resolution.unresolved);
			if let Some(fragment) = self.registry.get_mut(index) {
				fragment.data = resolution.value;
			}
		}
	}

	fn report_unresolved_links(&mut self, rel_path: &str, tokens: &[String]) {
		for token in tokens {
			tracing::warn!("unresolved data link `{token}` inside {rel_path}");
			self.record(rel_path, DiagnosticKind::UnresolvedLink {
				token: token.clone(),
			});
		}
	}

	/// Render the fragment `name` resolves to (a partial name or relative
	/// path) through its engine. The context holds the fragment's merged data
	/// plus `link` (the link table) and `listItems`.
	pub fn render_pattern(&self, name: &str) -> FragResult<String> {
		let fragment = self
			.registry
			.find_by_rel_path(name)
			.or_else(|| self.registry.get_partial(name))
			.ok_or_else(|| FragError::UnknownPattern(name.to_string()))?;
		let engine = self
			.engines
			.for_fragment(fragment)
			.ok_or_else(|| FragError::NoEngine(fragment.rel_path.clone()))?;

		let data = fragment
			.all_data
			.clone()
			.unwrap_or_else(|| merge_data(&self.registry.data, &fragment.data));
		let list_items = fragment
			.list_items
			.as_ref()
			.or(self.registry.list_items.as_ref());
		let context = self.render_context(data, list_items.map(crate::ListItems::to_value));

		engine.render(&fragment.extended_template, &context, &self.partials())
	}

	/// Render ad-hoc template text with the default engine. Without any
	/// engine the text is returned unchanged.
	pub fn render_template(&self, template: &str, data: &Value) -> FragResult<String> {
		let Some(engine) = self.engines.first() else {
			return Ok(template.to_string());
		};

		let list_items = self.registry.list_items.as_ref().map(crate::ListItems::to_value);
		let context = self.render_context(data.clone(), list_items);
		engine.render(template, &context, &self.partials())
	}

	fn render_context(&self, data: Value, list_items: Option<Value>) -> Value {
		let mut context = match data {
			Value::Object(map) => map,
			Value::Null => serde_json::Map::new(),
			other => {
				let mut map = serde_json::Map::new();
				map.insert("data".to_string(), other);
				map
			}
		};

		context.insert(
			"link".to_string(),
			serde_json::to_value(self.registry.links()).unwrap_or(Value::Null),
		);
		if let Some(list_items) = list_items {
			context.insert("listItems".to_string(), list_items);
		}

		Value::Object(context)
	}

	/// Expanded template text of every renderable fragment keyed by partial
	/// name. The first fragment registered under a name wins.
	fn partials(&self) -> BTreeMap<String, String> {
		let mut partials = BTreeMap::new();
		for fragment in self.registry.patterns().iter().filter(|f| f.is_pattern) {
			partials
				.entry(fragment.pattern_partial.clone())
				.or_insert_with(|| fragment.extended_template.clone());
		}
		partials
	}

	/// Collect every file below the pattern root as a sorted list of `/`
	/// separated relative paths. Hidden entries and `[exclude]` matches are
	/// skipped.
	pub fn collect_pattern_files(&self) -> FragResult<Vec<String>> {
		let patterns_root = self.patterns_root();
		if let Err(e) = std::fs::metadata(&patterns_root) {
			if e.kind() == std::io::ErrorKind::NotFound {
				tracing::debug!("no pattern directory at {}", patterns_root.display());
				return Ok(Vec::new());
			}
			return Err(e.into());
		}

		let exclude = build_exclude_matcher(&patterns_root, &self.config.exclude.patterns)?;
		let mut files = Vec::new();
		let mut visited_dirs = HashSet::new();

		walk_dir(
			&patterns_root,
			&patterns_root,
			&exclude,
			&mut files,
			&mut visited_dirs,
		)?;
		files.sort();

		Ok(files)
	}
}

/// Build a `Gitignore` matcher from `[exclude]` patterns.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> FragResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			FragError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| FragError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn walk_dir(
	root: &Path,
	dir: &Path,
	exclude: &Gitignore,
	files: &mut Vec<String>,
	visited_dirs: &mut HashSet<PathBuf>,
) -> FragResult<()> {
	// Symlinked directories may point back up the tree.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.starts_with('.'))
		{
			continue;
		}

		let is_dir = path.is_dir();
		if exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			walk_dir(root, &path, exclude, files, visited_dirs)?;
		} else if let Ok(rel_path) = path.strip_prefix(root) {
			files.push(rel_path.to_string_lossy().replace('\\', "/"));
		}
	}

	Ok(())
}

/// Read an optional sibling file. A missing path or a directory yields
/// `Ok(None)`.
pub(crate) fn read_sibling(path: &Path) -> std::io::Result<Option<String>> {
	match std::fs::metadata(path) {
		Ok(metadata) if metadata.is_file() => std::fs::read_to_string(path).map(Some),
		Ok(_) => Ok(None),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}
