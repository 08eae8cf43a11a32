use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Sample data built from a `*.listitems.json` file.
///
/// All values are flattened and shuffled exactly once. `samples["n"]` holds
/// the first `n` items of that single ordering, so smaller samples are always
/// prefixes of larger ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListItems {
	/// The raw keyed items as read from disk.
	pub items: Map<String, Value>,
	/// The single shuffled ordering of every item value.
	pub shuffled: Vec<Value>,
	/// Growing prefixes of [`ListItems::shuffled`] keyed by their length.
	pub samples: BTreeMap<String, Vec<Value>>,
}

impl ListItems {
	/// The first `n` shuffled items, if `n` is between 1 and the item count.
	pub fn sample(&self, n: usize) -> Option<&[Value]> {
		self.samples.get(&n.to_string()).map(Vec::as_slice)
	}

	pub fn len(&self) -> usize {
		self.shuffled.len()
	}

	pub fn is_empty(&self) -> bool {
		self.shuffled.is_empty()
	}

	/// The sample table as a JSON object, for template contexts.
	pub fn to_value(&self) -> Value {
		Value::Object(
			self.samples
				.iter()
				.map(|(key, items)| (key.clone(), Value::Array(items.clone())))
				.collect(),
		)
	}
}

/// Build list-item samples using the thread-local random generator.
pub fn build_list_items(items: Map<String, Value>) -> ListItems {
	build_list_items_with(items, &mut rand::rng())
}

/// Build list-item samples with a caller-supplied random generator.
pub fn build_list_items_with<R: Rng + ?Sized>(items: Map<String, Value>, rng: &mut R) -> ListItems {
	let mut shuffled: Vec<Value> = items.values().cloned().collect();
	shuffled.shuffle(rng);

	let samples = (1..=shuffled.len())
		.map(|n| (n.to_string(), shuffled[..n].to_vec()))
		.collect();

	ListItems {
		items,
		shuffled,
		samples,
	}
}
