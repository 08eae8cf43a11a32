use std::collections::BTreeMap;

use serde_json::Value;

use crate::EngineSet;
use crate::Fragment;
use crate::LinkTable;
use crate::ListItems;

/// Every fragment of one build together with the lookup tables derived from
/// them.
///
/// Fragments keep their insertion order. `rel_path` is the only key enforced
/// unique; partial names may collide and are disambiguated by
/// [`Registry::get_partial`] at lookup time.
#[derive(Debug)]
pub struct Registry {
	patterns: Vec<Fragment>,
	subtype_patterns: BTreeMap<String, Fragment>,
	links: LinkTable,
	aliases: BTreeMap<String, String>,
	/// Site-wide data shared by every fragment.
	pub data: Value,
	/// Site-wide list items built from the global `listitems` file.
	pub list_items: Option<ListItems>,
}

impl Default for Registry {
	fn default() -> Self {
		Self {
			patterns: Vec::new(),
			subtype_patterns: BTreeMap::new(),
			links: LinkTable::new(),
			aliases: BTreeMap::new(),
			data: Value::Object(serde_json::Map::new()),
			list_items: None,
		}
	}
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert `fragment`, replacing in place any fragment with the same
	/// `rel_path`. Returns the fragment's index.
	///
	/// The first time a renderable fragment is seen its link is recorded and
	/// its engine gets a chance to register aliases.
	pub fn add_pattern(&mut self, fragment: Fragment, engines: &EngineSet) -> usize {
		if let Some(index) = self.index_of(&fragment.rel_path) {
			self.patterns[index] = fragment;
			return index;
		}

		tracing::debug!("found new pattern {}", fragment.pattern_partial);

		if fragment.is_pattern {
			self.links.insert(
				fragment.pattern_partial.clone(),
				format!("/patterns/{}", fragment.pattern_link),
			);
			if let Some(engine) = engines.for_fragment(&fragment) {
				engine.register_partial(&fragment, self);
			}
		}

		self.patterns.push(fragment);
		self.patterns.len() - 1
	}

	/// Store a `viewall` index fragment. These live outside the main sequence
	/// and never resolve as partials.
	pub fn add_subtype_pattern(&mut self, fragment: Fragment) {
		self.subtype_patterns
			.insert(fragment.pattern_partial.clone(), fragment);
	}

	/// Record an engine-specific alias for a partial name.
	pub fn register_alias(&mut self, alias: impl Into<String>, pattern_partial: impl Into<String>) {
		self.aliases.insert(alias.into(), pattern_partial.into());
	}

	pub fn patterns(&self) -> &[Fragment] {
		&self.patterns
	}

	pub fn get(&self, index: usize) -> Option<&Fragment> {
		self.patterns.get(index)
	}

	pub fn get_mut(&mut self, index: usize) -> Option<&mut Fragment> {
		self.patterns.get_mut(index)
	}

	pub fn len(&self) -> usize {
		self.patterns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	pub fn index_of(&self, rel_path: &str) -> Option<usize> {
		self.patterns
			.iter()
			.position(|fragment| fragment.rel_path == rel_path)
	}

	pub fn find_by_rel_path(&self, rel_path: &str) -> Option<&Fragment> {
		self.index_of(rel_path).and_then(|index| self.get(index))
	}

	pub fn subtype_patterns(&self) -> &BTreeMap<String, Fragment> {
		&self.subtype_patterns
	}

	pub fn links(&self) -> &LinkTable {
		&self.links
	}

	pub fn link(&self, pattern_partial: &str) -> Option<&str> {
		self.links.get(pattern_partial).map(String::as_str)
	}

	/// Resolve a partial name to a fragment. See [`Registry::get_partial_index`].
	pub fn get_partial(&self, name: &str) -> Option<&Fragment> {
		self.get_partial_index(name).and_then(|index| self.get(index))
	}

	/// Resolve a partial name to a fragment index. Stages are tried in order
	/// and the first match wins:
	///
	/// 1. exact `pattern_partial`, then an engine-registered alias;
	/// 2. the legacy `group-filename` alias;
	/// 3. the relative path or `subdir/filename`;
	/// 4. fuzzy: same leading type segment and a partial name containing the
	///    rest of the requested name.
	///
	/// Only renderable fragments are candidates. A pseudopattern placeholder
	/// has no engine or template until its base is expanded, so it never
	/// matches. Returns `None` without logging; callers decide how to report
	/// an unresolved name.
	pub fn get_partial_index(&self, name: &str) -> Option<usize> {
		let candidates = || {
			self.patterns
				.iter()
				.enumerate()
				.filter(|(_, fragment)| is_candidate(fragment))
		};

		if let Some((index, _)) = candidates().find(|(_, f)| f.pattern_partial == name) {
			return Some(index);
		}

		if let Some(target) = self.aliases.get(name) {
			if let Some((index, _)) = candidates().find(|(_, f)| &f.pattern_partial == target) {
				return Some(index);
			}
		}

		if let Some((index, _)) = candidates().find(|(_, f)| f.legacy_alias() == name) {
			return Some(index);
		}

		if let Some((index, _)) =
			candidates().find(|(_, f)| f.rel_path == name || f.verbose_partial() == name)
		{
			return Some(index);
		}

		let (partial_type, remainder) = name.split_once('-').unwrap_or((name, ""));
		candidates()
			.find(|(_, f)| f.type_segment() == partial_type && f.pattern_partial.contains(remainder))
			.map(|(index, _)| index)
	}
}

fn is_candidate(fragment: &Fragment) -> bool {
	fragment.is_pattern && !(fragment.is_pseudo_pattern && fragment.engine.is_none())
}
