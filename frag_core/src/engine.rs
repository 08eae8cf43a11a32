use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::Fragment;
use crate::FragResult;
use crate::MinijinjaEngine;
use crate::Registry;

/// What a [`PatternEngine`] can do beyond rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct EngineCapabilities {
	/// Partial references may be substituted textually before rendering.
	pub expands_partials: bool,
	/// The syntax supports style-modifier annotations on partials.
	pub style_modifiers: bool,
	/// The syntax supports parameter annotations on partials.
	pub pattern_parameters: bool,
	/// The syntax supports list-item references.
	pub list_items: bool,
}

/// A template syntax the pattern library can discover, expand and render.
///
/// The library never interprets template text itself. Every question about
/// syntax (where the partial references are, which name a reference points
/// to, how to splice a partial in) is answered by the engine registered for
/// the fragment's file extension.
pub trait PatternEngine: fmt::Debug {
	/// Unique engine name, stored on every fragment it handles.
	fn name(&self) -> &str;

	/// Extensions this engine handles, including the leading dot.
	fn file_extensions(&self) -> &[&str];

	fn capabilities(&self) -> EngineCapabilities;

	/// Render `template` with `data`. `partials` maps partial names to their
	/// expanded template text for references that were left in place.
	fn render(
		&self,
		template: &str,
		data: &Value,
		partials: &BTreeMap<String, String>,
	) -> FragResult<String>;

	/// Every partial reference token in `template`, in order of appearance.
	/// A token appearing twice is returned twice.
	fn find_partials(&self, template: &str) -> Vec<String>;

	/// Every list-item reference token in `template`.
	fn find_list_items(&self, template: &str) -> Vec<String>;

	/// Partial tokens that carry a style-modifier annotation.
	fn find_partials_with_style_modifiers(&self, template: &str) -> Vec<String>;

	/// Partial tokens that carry a parameter annotation.
	fn find_partials_with_pattern_parameters(&self, template: &str) -> Vec<String>;

	/// The partial name a reference token points to, without annotations.
	fn partial_key(&self, token: &str) -> String;

	/// The text that replaces `token` once the referenced partial's text is
	/// known. Annotations on the token must survive verbatim.
	fn substitute(&self, token: &str, partial_text: &str) -> String;

	/// Called once when a fragment handled by this engine is first added to
	/// the registry, so engine-specific aliases can be recorded.
	fn register_partial(&self, fragment: &Fragment, registry: &mut Registry);
}

/// The ordered set of engines available to a build. The first engine is the
/// default renderer for ad-hoc templates.
#[derive(Debug)]
pub struct EngineSet {
	engines: Vec<Box<dyn PatternEngine>>,
}

impl Default for EngineSet {
	fn default() -> Self {
		Self {
			engines: vec![Box::new(MinijinjaEngine::new())],
		}
	}
}

impl EngineSet {
	/// An empty engine set. No file is a supported pattern file.
	pub fn empty() -> Self {
		Self {
			engines: Vec::new(),
		}
	}

	/// Add an engine after those already registered.
	pub fn register(&mut self, engine: Box<dyn PatternEngine>) -> &mut Self {
		self.engines.push(engine);
		self
	}

	pub fn get(&self, name: &str) -> Option<&dyn PatternEngine> {
		self.engines
			.iter()
			.find(|engine| engine.name() == name)
			.map(AsRef::as_ref)
	}

	/// The engine responsible for an extension such as `.jinja`.
	pub fn for_extension(&self, extension: &str) -> Option<&dyn PatternEngine> {
		self.engines
			.iter()
			.find(|engine| engine.file_extensions().contains(&extension))
			.map(AsRef::as_ref)
	}

	/// The engine recorded on `fragment`, if any.
	pub fn for_fragment(&self, fragment: &Fragment) -> Option<&dyn PatternEngine> {
		fragment.engine.as_deref().and_then(|name| self.get(name))
	}

	/// The default engine for ad-hoc rendering.
	pub fn first(&self) -> Option<&dyn PatternEngine> {
		self.engines.first().map(AsRef::as_ref)
	}

	pub fn is_supported_extension(&self, extension: &str) -> bool {
		self.for_extension(extension).is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.engines.is_empty()
	}
}
