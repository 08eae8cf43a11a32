use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::EngineCapabilities;
use crate::FragError;
use crate::FragResult;
use crate::Fragment;
use crate::PatternEngine;
use crate::Registry;

const INLINE_TEMPLATE: &str = "__inline__";

static INCLUDE_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{%-?\s*include\s+(?:"([^"]+)"|'([^']+)')(?:\s+with\s+(.+?))?\s*-?%\}"#)
		.unwrap_or_else(|e| panic!("invalid include regex: {e}"))
});

static LIST_ITEMS_REF: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"listItems(?:\.[A-Za-z_][A-Za-z0-9_]*|\[\s*["']?[A-Za-z0-9_]+["']?\s*\])"#)
		.unwrap_or_else(|e| panic!("invalid list item regex: {e}"))
});

/// A parsed `{% include %}` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IncludeTag<'a> {
	name: &'a str,
	style_modifier: Option<&'a str>,
	parameters: Option<&'a str>,
}

fn parse_include(token: &str) -> Option<IncludeTag<'_>> {
	let captures = INCLUDE_TAG.captures(token)?;
	let target = captures.get(1).or_else(|| captures.get(2))?.as_str();
	let (name, style_modifier) = match target.split_once(':') {
		Some((name, modifier)) => (name.trim(), Some(modifier.trim())),
		None => (target.trim(), None),
	};
	let parameters = captures
		.get(3)
		.map(|m| m.as_str().trim())
		.filter(|args| !args.is_empty());

	Some(IncludeTag {
		name,
		style_modifier,
		parameters,
	})
}

/// The default engine, backed by [`minijinja`].
///
/// Partials are referenced with include tags:
///
/// ```jinja
/// {% include "atoms-button" %}
/// {% include "atoms-button:primary|large" %}
/// {% include "atoms-button" with label="Go", size="lg" %}
/// ```
///
/// When a partial is spliced in, a style modifier becomes a surrounding
/// `{% with styleModifier = "primary|large" %}` block and parameters become
/// `{% with label="Go", size="lg" %}`, leaving their interpretation to render
/// time.
#[derive(Debug, Clone, Default)]
pub struct MinijinjaEngine;

impl MinijinjaEngine {
	pub const NAME: &'static str = "minijinja";

	pub fn new() -> Self {
		Self
	}
}

impl PatternEngine for MinijinjaEngine {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn file_extensions(&self) -> &[&str] {
		&[".jinja", ".j2"]
	}

	fn capabilities(&self) -> EngineCapabilities {
		EngineCapabilities {
			expands_partials: true,
			style_modifiers: true,
			pattern_parameters: true,
			list_items: true,
		}
	}

	fn render(
		&self,
		template: &str,
		data: &Value,
		partials: &BTreeMap<String, String>,
	) -> FragResult<String> {
		let mut env = minijinja::Environment::new();
		env.set_keep_trailing_newline(true);
		env.set_undefined_behavior(minijinja::UndefinedBehavior::Chainable);

		for (name, source) in partials {
			if let Err(e) = env.add_template(name, source) {
				tracing::debug!("skipping partial `{name}` during render: {e}");
			}
		}

		env.add_template(INLINE_TEMPLATE, template)
			.map_err(|e| FragError::TemplateRender(e.to_string()))?;
		let template = env
			.get_template(INLINE_TEMPLATE)
			.map_err(|e| FragError::TemplateRender(e.to_string()))?;

		template
			.render(minijinja::Value::from_serialize(data))
			.map_err(|e| FragError::TemplateRender(e.to_string()))
	}

	fn find_partials(&self, template: &str) -> Vec<String> {
		INCLUDE_TAG
			.find_iter(template)
			.map(|m| m.as_str().to_string())
			.collect()
	}

	fn find_list_items(&self, template: &str) -> Vec<String> {
		LIST_ITEMS_REF
			.find_iter(template)
			.map(|m| m.as_str().to_string())
			.collect()
	}

	fn find_partials_with_style_modifiers(&self, template: &str) -> Vec<String> {
		self.find_partials(template)
			.into_iter()
			.filter(|token| parse_include(token).is_some_and(|tag| tag.style_modifier.is_some()))
			.collect()
	}

	fn find_partials_with_pattern_parameters(&self, template: &str) -> Vec<String> {
		self.find_partials(template)
			.into_iter()
			.filter(|token| parse_include(token).is_some_and(|tag| tag.parameters.is_some()))
			.collect()
	}

	fn partial_key(&self, token: &str) -> String {
		parse_include(token).map_or_else(|| token.trim().to_string(), |tag| tag.name.to_string())
	}

	fn substitute(&self, token: &str, partial_text: &str) -> String {
		let Some(tag) = parse_include(token) else {
			return partial_text.to_string();
		};

		let mut text = partial_text.to_string();
		if let Some(parameters) = tag.parameters {
			text = format!("{{% with {parameters} %}}{text}{{% endwith %}}");
		}
		if let Some(modifier) = tag.style_modifier {
			text = format!("{{% with styleModifier = \"{modifier}\" %}}{text}{{% endwith %}}");
		}
		text
	}

	fn register_partial(&self, fragment: &Fragment, registry: &mut Registry) {
		if fragment.pattern_group.is_empty() {
			return;
		}

		registry.register_alias(
			format!("{}/{}", fragment.pattern_group, fragment.pattern_base_name),
			fragment.pattern_partial.clone(),
		);
	}
}
