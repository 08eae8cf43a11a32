use std::path::Path;

use serde_json::Value;

use crate::DiagnosticKind;
use crate::EngineSet;
use crate::ExpansionState;
use crate::Fragment;
use crate::Library;
use crate::build_list_items;
use crate::get_data_keys;
use crate::is_pseudo_pattern_json;
use crate::library::read_sibling;
use crate::parse_relaxed_json;

/// What discovery did with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
	/// A renderable fragment, registered at this index.
	Pattern(usize),
	/// A `name~variant.json` placeholder, registered at this index. The real
	/// variant replaces it when its base fragment is expanded.
	Pseudopattern(usize),
	/// A file without an engine, registered at this index for identity only.
	Unsupported(usize),
	/// A `viewall` index registered under this partial name.
	Subtype(String),
	/// Companion data, markdown, dotfiles and other non-fragment files.
	Ignored,
}

impl Library {
	/// Discover one file below the pattern root and register what it
	/// describes. Recoverable problems are logged and recorded as diagnostics;
	/// discovery never fails.
	pub fn process_pattern_iterative(&mut self, rel_path: &str) -> Discovered {
		let mut fragment = Fragment::new(rel_path);
		let file_name = fragment
			.rel_path
			.rsplit('/')
			.next()
			.unwrap_or_default()
			.to_string();

		if fragment.file_extension == ".md" {
			return match self.process_subtype(fragment) {
				Some(name) => Discovered::Subtype(name),
				None => Discovered::Ignored,
			};
		}

		if !is_fragment_candidate(&file_name, &fragment.file_extension) {
			tracing::trace!("ignoring {rel_path}");
			return Discovered::Ignored;
		}

		if is_pseudo_pattern_json(&file_name) {
			fragment.is_pseudo_pattern = true;
			return Discovered::Pseudopattern(self.registry.add_pattern(fragment, &self.engines));
		}

		let Some(engine_name) = self
			.engines
			.for_extension(&fragment.file_extension)
			.map(|engine| engine.name().to_string())
		else {
			tracing::debug!("no engine for {rel_path}, registering without expansion");
			fragment.is_pattern = false;
			fragment.expansion = ExpansionState::Skipped;
			return Discovered::Unsupported(self.registry.add_pattern(fragment, &self.engines));
		};
		fragment.engine = Some(engine_name);

		self.set_state(&mut fragment);
		self.read_local_data(&mut fragment);
		fragment.data_keys = get_data_keys(&fragment.data);
		self.read_local_list_items(&mut fragment);
		self.parse_pattern_markdown(&mut fragment);

		let patterns_root = self.patterns_root();
		match std::fs::read_to_string(patterns_root.join(&fragment.rel_path)) {
			Ok(template) => fragment.set_template(template),
			Err(e) => {
				tracing::warn!("could not read template {rel_path}: {e}");
				self.record(&fragment.rel_path, DiagnosticKind::Io {
					reason: e.to_string(),
				});
			}
		}

		scan_references(&self.engines, &mut fragment);
		fragment.expansion = ExpansionState::MetadataLoaded;

		Discovered::Pattern(self.registry.add_pattern(fragment, &self.engines))
	}

	/// A `.md` file next to a directory of the same name is that directory's
	/// `viewall` index.
	fn process_subtype(&mut self, mut fragment: Fragment) -> Option<String> {
		let patterns_root = self.patterns_root();
		let dir = patterns_root.join(&fragment.subdir).join(&fragment.file_name);
		if !dir.is_dir() {
			return None;
		}

		let content = match std::fs::read_to_string(patterns_root.join(&fragment.rel_path)) {
			Ok(content) => content,
			Err(e) => {
				tracing::warn!("could not read {}: {e}", fragment.rel_path);
				self.record(&fragment.rel_path, DiagnosticKind::Io {
					reason: e.to_string(),
				});
				return None;
			}
		};

		match self.frontmatter.parse(&content) {
			Ok(frontmatter) => {
				fragment.description_exists = !frontmatter.body.is_empty();
				fragment.description = frontmatter.body;
			}
			Err(e) => {
				tracing::warn!("error processing markdown for {}: {e}", fragment.rel_path);
				self.record(&fragment.rel_path, DiagnosticKind::MalformedData {
					reason: e.to_string(),
				});
			}
		}

		fragment.pattern_partial = format!("viewall-{}", fragment.pattern_partial);
		fragment.pattern_link = format!("{}/index.html", fragment.name);
		fragment.is_subtype = true;
		fragment.is_pattern = false;
		fragment.expansion = ExpansionState::Skipped;

		let name = fragment.pattern_partial.clone();
		tracing::debug!("found subtype index {name}");
		self.registry.add_subtype_pattern(fragment);
		Some(name)
	}

	/// Apply a state from the deprecated `[pattern_states]` table.
	fn set_state(&mut self, fragment: &mut Fragment) {
		let Some(state) = self.config.pattern_states.get(&fragment.pattern_partial).cloned() else {
			return;
		};

		if !self.deprecation_warned {
			self.deprecation_warned = true;
			let message = "`[pattern_states]` is deprecated, set `state` in the pattern's \
			               markdown frontmatter instead"
				.to_string();
			tracing::warn!("{message}");
			self.record(&fragment.rel_path, DiagnosticKind::DeprecatedConfig { message });
		}

		fragment.state = state;
	}

	fn read_local_data(&mut self, fragment: &mut Fragment) {
		let path = fragment.sibling_path(&self.patterns_root(), ".json");
		let Some(content) = self.read_optional(&fragment.rel_path, &path) else {
			return;
		};

		match parse_relaxed_json(&content) {
			Ok(data) => {
				tracing::debug!("found pattern-specific data for {}", fragment.pattern_partial);
				fragment.data = data;
			}
			Err(reason) => {
				tracing::warn!(
					"there was an error parsing sibling JSON for {}: {reason}",
					fragment.rel_path
				);
				self.record(&fragment.rel_path, DiagnosticKind::MalformedData { reason });
			}
		}
	}

	fn read_local_list_items(&mut self, fragment: &mut Fragment) {
		let path = fragment.sibling_path(&self.patterns_root(), ".listitems.json");
		let Some(content) = self.read_optional(&fragment.rel_path, &path) else {
			return;
		};

		match parse_relaxed_json(&content) {
			Ok(Value::Object(items)) => {
				tracing::debug!("found pattern-specific list items for {}", fragment.pattern_partial);
				fragment.list_items = Some(build_list_items(items));
			}
			Ok(_) => {
				tracing::warn!("list items for {} must be an object", fragment.rel_path);
				self.record(&fragment.rel_path, DiagnosticKind::MalformedData {
					reason: "list items must be an object".to_string(),
				});
			}
			Err(reason) => {
				tracing::warn!(
					"there was an error parsing sibling list items for {}: {reason}",
					fragment.rel_path
				);
				self.record(&fragment.rel_path, DiagnosticKind::MalformedData { reason });
			}
		}
	}

	/// Read the companion markdown and overwrite every attribute it sets.
	fn parse_pattern_markdown(&mut self, fragment: &mut Fragment) {
		let path = fragment.sibling_path(&self.patterns_root(), ".md");
		let Some(content) = self.read_optional(&fragment.rel_path, &path) else {
			return;
		};

		let frontmatter = match self.frontmatter.parse(&content) {
			Ok(frontmatter) => frontmatter,
			Err(e) => {
				tracing::warn!("error processing markdown for {}: {e}", fragment.rel_path);
				self.record(&fragment.rel_path, DiagnosticKind::MalformedData {
					reason: e.to_string(),
				});
				return;
			}
		};

		if frontmatter.is_empty() {
			tracing::debug!("empty markdown for {}", fragment.rel_path);
			return;
		}

		fragment.description = frontmatter.body;
		fragment.description_exists = true;
		if let Some(state) = frontmatter.state {
			fragment.state = state;
		}
		if let Some(order) = frontmatter.order {
			fragment.order = Some(order);
		}
		if let Some(hidden) = frontmatter.hidden {
			fragment.hidden = hidden;
		}
		if let Some(exclude) = frontmatter.exclude_from_styleguide {
			fragment.exclude_from_styleguide = exclude;
		}
		if let Some(tags) = frontmatter.tags {
			fragment.tags = tags;
		}
		if let Some(links) = frontmatter.links {
			fragment.links = links;
		}
	}

	/// Read a sibling file, recording any failure other than absence.
	fn read_optional(&mut self, rel_path: &str, path: &Path) -> Option<String> {
		match read_sibling(path) {
			Ok(content) => content,
			Err(e) => {
				tracing::warn!("could not read {}: {e}", path.display());
				self.record(rel_path, DiagnosticKind::Io {
					reason: e.to_string(),
				});
				None
			}
		}
	}
}

/// Companion `.json` and `.listitems.json` files describe another fragment
/// and are not fragments themselves. Dotfiles are never fragments.
fn is_fragment_candidate(file_name: &str, extension: &str) -> bool {
	if file_name.starts_with('.') {
		return false;
	}

	extension != ".json" || is_pseudo_pattern_json(file_name)
}

/// Scan the fragment's current template with its engine.
pub(crate) fn scan_references(engines: &EngineSet, fragment: &mut Fragment) {
	let Some(engine) = engines.for_fragment(fragment) else {
		return;
	};
	let capabilities = engine.capabilities();
	let template = &fragment.extended_template;

	let pattern_partials = engine.find_partials(template);
	let style_partials = if capabilities.style_modifiers {
		engine.find_partials_with_style_modifiers(template)
	} else {
		Vec::new()
	};
	let parameterized_partials = if capabilities.pattern_parameters {
		engine.find_partials_with_pattern_parameters(template)
	} else {
		Vec::new()
	};
	let list_item_refs = if capabilities.list_items {
		engine.find_list_items(template)
	} else {
		Vec::new()
	};

	fragment.pattern_partials = pattern_partials;
	fragment.style_partials = style_partials;
	fragment.parameterized_partials = parameterized_partials;
	fragment.list_item_refs = list_item_refs;
}
