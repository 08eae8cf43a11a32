use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Canonical URL for every registered pattern, keyed by partial name.
pub type LinkTable = BTreeMap<String, String>;

static LINK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"link\.([A-Za-z0-9_-]+)").unwrap_or_else(|e| panic!("invalid link regex: {e}"))
});

/// Parse JSON using the relaxed JSON5 grammar (comments, trailing commas,
/// unquoted keys, single-quoted strings). Returns the parser's message on
/// failure.
pub fn parse_relaxed_json(content: &str) -> Result<Value, String> {
	json5::from_str::<Value>(content).map_err(|e| e.to_string())
}

/// Recursively collect every distinct property name that appears anywhere in
/// `data`. Array elements are traversed but their indices are never treated
/// as keys. Each name appears once, in first-seen order.
pub fn get_data_keys(data: &Value) -> Vec<String> {
	let mut keys = Vec::new();
	collect_data_keys(data, &mut keys);
	keys
}

fn collect_data_keys(data: &Value, keys: &mut Vec<String>) {
	match data {
		Value::Object(map) => {
			for (key, value) in map {
				if !keys.iter().any(|existing| existing == key) {
					keys.push(key.clone());
				}
				collect_data_keys(value, keys);
			}
		}
		Value::Array(items) => {
			for item in items {
				collect_data_keys(item, keys);
			}
		}
		_ => {}
	}
}

/// Deep-merge `local` over `global`. Objects merge key by key; on any other
/// conflict the local value wins. Arrays are replaced wholesale, never
/// concatenated. A `null` local value yields a copy of `global`.
pub fn merge_data(global: &Value, local: &Value) -> Value {
	match (global, local) {
		(Value::Object(global_map), Value::Object(local_map)) => {
			let mut merged = local_map.clone();
			for (key, global_value) in global_map {
				match merged.get_mut(key) {
					Some(local_value) => {
						if global_value.is_object() && local_value.is_object() {
							*local_value = merge_data(global_value, local_value);
						}
					}
					None => {
						merged.insert(key.clone(), global_value.clone());
					}
				}
			}
			Value::Object(merged)
		}
		(_, Value::Null) => global.clone(),
		_ => local.clone(),
	}
}

/// The outcome of rewriting `link.*` tokens inside a data value.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkResolution {
	/// The rewritten value.
	pub value: Value,
	/// Tokens (e.g. `link.pages-missing`) with no entry in the link table,
	/// in order of appearance.
	pub unresolved: Vec<String>,
}

/// Replace every `link.<name>` token found inside string values of `value`
/// with the URL registered for `<name>`. Tokens are matched anywhere inside a
/// string, so `"see link.atoms-button"` becomes `"see /patterns/..."`.
/// Object keys are never rewritten. Unknown tokens are left verbatim and
/// reported in [`LinkResolution::unresolved`].
pub fn resolve_data_links(value: &Value, links: &LinkTable) -> LinkResolution {
	let mut unresolved = Vec::new();
	let value = rewrite_links(value, links, &mut unresolved);
	LinkResolution { value, unresolved }
}

fn rewrite_links(value: &Value, links: &LinkTable, unresolved: &mut Vec<String>) -> Value {
	match value {
		Value::String(text) => Value::String(rewrite_link_tokens(text, links, unresolved)),
		Value::Array(items) => {
			Value::Array(
				items
					.iter()
					.map(|item| rewrite_links(item, links, unresolved))
					.collect(),
			)
		}
		Value::Object(map) => {
			Value::Object(
				map.iter()
					.map(|(key, item)| (key.clone(), rewrite_links(item, links, unresolved)))
					.collect(),
			)
		}
		other => other.clone(),
	}
}

fn rewrite_link_tokens(text: &str, links: &LinkTable, unresolved: &mut Vec<String>) -> String {
	if !text.contains("link.") {
		return text.to_string();
	}

	LINK_TOKEN
		.replace_all(text, |captures: &regex::Captures<'_>| {
			let token = &captures[0];
			match links.get(&captures[1]) {
				Some(url) => url.clone(),
				None => {
					unresolved.push(token.to_string());
					token.to_string()
				}
			}
		})
		.into_owned()
}
