use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::ListItems;

/// Where a fragment is in the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpansionState {
	/// Created from a path, nothing read yet.
	#[default]
	New,
	/// Sibling data, markdown and the raw template have been read.
	MetadataLoaded,
	/// Pseudopattern variants of this fragment have been discovered.
	PseudopatternChecked,
	/// Local data has been merged over the global data.
	DataMerged,
	/// The current expanded template has been scanned for partials.
	ReferencesScanned,
	/// No further expandable references remain.
	Expanded,
	/// The fragment has no engine and is never expanded.
	Skipped,
}

/// One entry in a fragment's lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEntry {
	pub pattern_partial: String,
	pub link: String,
}

/// A reusable template unit discovered on the pattern tree together with all
/// of its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Fragment {
	/// Path relative to the pattern source root, e.g.
	/// `00-atoms/01-buttons/00-button.jinja`. Unique within a registry.
	pub rel_path: String,
	/// File name without its extension, e.g. `00-button`.
	pub file_name: String,
	/// Directory part of `rel_path`, e.g. `00-atoms/01-buttons`.
	pub subdir: String,
	/// Extension including the dot, e.g. `.jinja`.
	pub file_extension: String,
	/// Flattened path, e.g. `00-atoms-01-buttons-00-button`.
	pub name: String,
	/// File name without ordinal prefix, e.g. `button`.
	pub pattern_base_name: String,
	/// Human-readable title, e.g. `Button`.
	pub pattern_name: String,
	pub pattern_group: String,
	pub pattern_sub_group: String,
	/// The name other templates use to include this fragment, e.g.
	/// `atoms-button`.
	pub pattern_partial: String,
	/// Link relative to the `patterns/` output directory.
	pub pattern_link: String,

	/// Raw template source, never modified after it is read.
	pub template: String,
	/// Working copy of the template with partials substituted.
	pub extended_template: String,

	/// Data read from the sibling `.json` file.
	pub data: Value,
	/// Local data merged over the global data. Computed once.
	pub all_data: Option<Value>,
	/// Every property name found in `data`.
	pub data_keys: Vec<String>,
	pub list_items: Option<ListItems>,

	pub state: String,
	pub order: Option<i64>,
	pub hidden: bool,
	pub exclude_from_styleguide: bool,
	pub tags: Vec<String>,
	pub links: Vec<Value>,
	pub description: String,
	pub description_exists: bool,

	/// Partial reference tokens found during the latest scan.
	pub pattern_partials: Vec<String>,
	pub style_partials: Vec<String>,
	pub parameterized_partials: Vec<String>,
	pub list_item_refs: Vec<String>,

	pub lineage: Vec<LineageEntry>,
	pub lineage_index: Vec<String>,
	pub reverse_lineage: Vec<LineageEntry>,
	pub reverse_lineage_index: Vec<String>,

	/// False for markdown-only and unsupported files. These never resolve
	/// as partials.
	pub is_pattern: bool,
	pub is_pseudo_pattern: bool,
	/// Partial name of the fragment a pseudopattern was derived from.
	pub base_pattern: Option<String>,
	/// True for `viewall` index fragments.
	pub is_subtype: bool,
	/// Name of the engine that handles this fragment.
	pub engine: Option<String>,
	pub expansion: ExpansionState,
	#[serde(skip)]
	pub(crate) variants_checked: bool,
}

impl Fragment {
	/// Create a fragment whose identity is derived from `rel_path`.
	pub fn new(rel_path: impl AsRef<str>) -> Self {
		let rel_path = normalize_rel_path(rel_path.as_ref());
		let (subdir, base) = match rel_path.rsplit_once('/') {
			Some((subdir, base)) => (subdir.to_string(), base.to_string()),
			None => (String::new(), rel_path.clone()),
		};
		let (file_name, file_extension) = split_extension(&base);

		let pattern_base_name = strip_ordinal(&file_name.replace('~', "-")).to_string();
		let pattern_group = subdir
			.split('/')
			.next()
			.map(|segment| strip_ordinal(segment).to_string())
			.unwrap_or_default();
		let pattern_sub_group = subdir
			.rsplit('/')
			.next()
			.map(|segment| strip_ordinal(segment).to_string())
			.unwrap_or_default();
		let pattern_partial = if pattern_group.is_empty() {
			pattern_base_name.clone()
		} else {
			format!("{pattern_group}-{pattern_base_name}")
		};

		let flat_file_name = file_name.replace('~', "-");
		let name = if subdir.is_empty() {
			flat_file_name
		} else {
			format!("{}-{flat_file_name}", subdir.replace('/', "-"))
		};
		let pattern_link = format!("{name}/{name}.html");

		Self {
			pattern_name: title_case(&pattern_base_name),
			rel_path,
			file_name,
			subdir,
			file_extension,
			name,
			pattern_base_name,
			pattern_group,
			pattern_sub_group,
			pattern_partial,
			pattern_link,
			template: String::new(),
			extended_template: String::new(),
			data: Value::Object(serde_json::Map::new()),
			all_data: None,
			data_keys: Vec::new(),
			list_items: None,
			state: String::new(),
			order: None,
			hidden: false,
			exclude_from_styleguide: false,
			tags: Vec::new(),
			links: Vec::new(),
			description: String::new(),
			description_exists: false,
			pattern_partials: Vec::new(),
			style_partials: Vec::new(),
			parameterized_partials: Vec::new(),
			list_item_refs: Vec::new(),
			lineage: Vec::new(),
			lineage_index: Vec::new(),
			reverse_lineage: Vec::new(),
			reverse_lineage_index: Vec::new(),
			is_pattern: true,
			is_pseudo_pattern: false,
			base_pattern: None,
			is_subtype: false,
			engine: None,
			expansion: ExpansionState::New,
			variants_checked: false,
		}
	}

	/// Set the raw template, resetting the working copy to match it.
	pub fn set_template(&mut self, template: impl Into<String>) {
		self.template = template.into();
		self.extended_template = self.template.clone();
	}

	/// The `group-filename` form older tooling used for hidden and ordered
	/// patterns: the leading underscore and ordinal are dropped from the file
	/// name.
	pub fn legacy_alias(&self) -> String {
		let file_name = self.file_name.strip_prefix('_').unwrap_or(&self.file_name);
		format!("{}-{}", self.pattern_group, strip_ordinal(file_name))
	}

	/// The `subdir/filename` form accepted by path-based partial lookups.
	pub fn verbose_partial(&self) -> String {
		format!("{}/{}", self.subdir, self.file_name)
	}

	/// The leading segment of the partial name, e.g. `atoms` for
	/// `atoms-button`.
	pub fn type_segment(&self) -> &str {
		self.pattern_partial
			.split('-')
			.next()
			.unwrap_or(&self.pattern_partial)
	}

	/// Path of a sibling file sharing this fragment's name, e.g. the
	/// `.json` or `.listitems.json` next to the template.
	pub(crate) fn sibling_path(&self, patterns_root: &Path, suffix: &str) -> PathBuf {
		patterns_root
			.join(&self.subdir)
			.join(format!("{}{suffix}", self.file_name))
	}

	/// Whether this fragment was registered from a `name~variant.json` file.
	pub fn is_pseudo_pattern_file(&self) -> bool {
		is_pseudo_pattern_json(&self.rel_path)
	}
}

/// Whether a file name follows the `name~variant.json` pseudopattern
/// convention.
pub fn is_pseudo_pattern_json(file_name: &str) -> bool {
	file_name.ends_with(".json") && file_name.contains('~')
}

/// Remove a leading `<digits>-` ordinal, e.g. `00-atoms` → `atoms`.
pub(crate) fn strip_ordinal(segment: &str) -> &str {
	segment
		.trim_start_matches(|c: char| c.is_ascii_digit())
		.strip_prefix('-')
		.unwrap_or(segment)
}

fn normalize_rel_path(rel_path: &str) -> String {
	let normalized = rel_path.replace('\\', "/");
	normalized
		.strip_prefix("./")
		.unwrap_or(&normalized)
		.trim_start_matches('/')
		.to_string()
}

fn split_extension(base: &str) -> (String, String) {
	match base.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
		_ => (base.to_string(), String::new()),
	}
}

fn title_case(base_name: &str) -> String {
	base_name
		.split('-')
		.filter(|word| !word.is_empty())
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<String>>()
		.join(" ")
}
