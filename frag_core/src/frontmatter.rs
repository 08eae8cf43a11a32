use std::fmt;

use markdown::Constructs;
use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_mdast;
use serde_json::Value;

use crate::FragError;
use crate::FragResult;

/// Attributes read from a fragment's companion markdown file. Fields absent
/// from the frontmatter are `None` and leave the fragment untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
	/// Markdown after the frontmatter block.
	pub body: String,
	pub state: Option<String>,
	pub order: Option<i64>,
	pub hidden: Option<bool>,
	pub exclude_from_styleguide: Option<bool>,
	pub tags: Option<Vec<String>>,
	pub links: Option<Vec<Value>>,
}

impl Frontmatter {
	/// True when neither a body nor any attribute was found.
	pub fn is_empty(&self) -> bool {
		self.body.is_empty()
			&& self.state.is_none()
			&& self.order.is_none()
			&& self.hidden.is_none()
			&& self.exclude_from_styleguide.is_none()
			&& self.tags.is_none()
			&& self.links.is_none()
	}
}

/// Turns companion markdown into [`Frontmatter`].
pub trait FrontmatterParser: fmt::Debug {
	fn parse(&self, content: &str) -> FragResult<Frontmatter>;
}

/// Parses a leading `---` YAML block with the `markdown` crate and reads it
/// with `serde_yaml_ng`.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFrontmatter;

impl FrontmatterParser for MarkdownFrontmatter {
	fn parse(&self, content: &str) -> FragResult<Frontmatter> {
		if content.trim().is_empty() {
			return Ok(Frontmatter::default());
		}

		let options = ParseOptions {
			constructs: Constructs {
				frontmatter: true,
				..Constructs::gfm()
			},
			..ParseOptions::gfm()
		};
		let mdast = to_mdast(content, &options).map_err(|e| FragError::Markdown(e.to_string()))?;

		let yaml = mdast.children().and_then(|children| {
			children.iter().find_map(|node| {
				match node {
					Node::Yaml(yaml) => Some(yaml),
					_ => None,
				}
			})
		});

		let Some(yaml) = yaml else {
			return Ok(Frontmatter {
				body: content.trim().to_string(),
				..Frontmatter::default()
			});
		};

		let body_start = yaml.position.as_ref().map_or(0, |position| position.end.offset);
		let body = content.get(body_start..).unwrap_or_default().trim().to_string();

		let fields: Value = if yaml.value.trim().is_empty() {
			Value::Null
		} else {
			serde_yaml_ng::from_str(&yaml.value)
				.map_err(|e| FragError::Markdown(format!("invalid frontmatter: {e}")))?
		};

		Ok(Frontmatter {
			body,
			state: fields.get("state").and_then(Value::as_str).map(str::to_string),
			order: fields.get("order").and_then(read_order),
			hidden: fields.get("hidden").and_then(Value::as_bool),
			exclude_from_styleguide: fields
				.get("excludeFromStyleguide")
				.or_else(|| fields.get("exclude_from_styleguide"))
				.and_then(Value::as_bool),
			tags: fields.get("tags").and_then(read_tags),
			links: fields.get("links").and_then(Value::as_array).cloned(),
		})
	}
}

fn read_order(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

/// Tags may be a YAML list or a single comma-separated string.
fn read_tags(value: &Value) -> Option<Vec<String>> {
	match value {
		Value::Array(items) => {
			Some(
				items
					.iter()
					.filter_map(Value::as_str)
					.map(str::to_string)
					.collect(),
			)
		}
		Value::String(text) => {
			Some(
				text.split(',')
					.map(str::trim)
					.filter(|tag| !tag.is_empty())
					.map(str::to_string)
					.collect(),
			)
		}
		_ => None,
	}
}
