use std::collections::HashSet;

use crate::BuildDiagnostic;
use crate::DiagnosticKind;
use crate::ExpansionState;
use crate::FragError;
use crate::FragResult;
use crate::Library;
use crate::PatternEngine;
use crate::Registry;
use crate::merge_data;

impl Library {
	/// Expand every registered fragment in registration order. A failure on
	/// one fragment is logged and recorded, and the rest still expand.
	pub fn expand_all(&mut self) {
		let mut index = 0;
		// Expansion registers pseudopatterns, so the length is re-read.
		while index < self.registry.len() {
			let rel_path = self.registry.patterns()[index].rel_path.clone();
			if let Err(e) = self.process_pattern_recursive(&rel_path) {
				tracing::error!("{e}");
				let kind = match e {
					FragError::CyclicReference { chain, .. } => DiagnosticKind::CyclicReference { chain },
					other => DiagnosticKind::Io {
						reason: other.to_string(),
					},
				};
				self.record(&rel_path, kind);
			}
			index += 1;
		}
	}

	/// Expand the fragment registered under `rel_path` until its working
	/// template contains no resolvable partial references.
	///
	/// Pseudopattern placeholders and fragments without an engine are left
	/// alone. The first call also registers and expands the fragment's
	/// variants. Calling this again on an expanded fragment changes nothing.
	pub fn process_pattern_recursive(&mut self, rel_path: &str) -> FragResult<()> {
		let Some(index) = self.registry.index_of(rel_path) else {
			tracing::debug!("{rel_path} is not a registered pattern");
			return Ok(());
		};

		let fragment = &self.registry.patterns()[index];
		if fragment.is_pseudo_pattern_file() {
			tracing::trace!("skipping pseudopattern {rel_path}, expanded with its base");
			return Ok(());
		}
		if !fragment.is_pattern || fragment.engine.is_none() {
			if let Some(fragment) = self.registry.get_mut(index) {
				fragment.expansion = ExpansionState::Skipped;
			}
			return Ok(());
		}

		let variants = if fragment.variants_checked {
			Vec::new()
		} else {
			self.find_variants(index)
		};

		self.merge_fragment_data(index);
		if let Some(chain) = self.find_cycle(index) {
			return Err(FragError::CyclicReference {
				pattern: rel_path.to_string(),
				chain,
			});
		}
		self.expand_partials(index);

		for variant in variants {
			self.merge_fragment_data(variant);
			self.expand_partials(variant);
		}

		Ok(())
	}

	fn find_variants(&mut self, index: usize) -> Vec<usize> {
		let patterns_root = self.patterns_root();
		let results = self.pseudopatterns.find_pseudopatterns(
			index,
			&patterns_root,
			&mut self.registry,
			&self.engines,
		);

		if let Some(fragment) = self.registry.get_mut(index) {
			fragment.variants_checked = true;
			fragment.expansion = ExpansionState::PseudopatternChecked;
		}

		let rel_path = self.registry.patterns()[index].rel_path.clone();
		let mut variants = Vec::new();
		for result in results {
			match result {
				Ok(variant) => variants.push(variant),
				Err(FragError::DataFile { path, reason }) => {
					tracing::warn!("there was an error parsing pseudopattern JSON for {path}: {reason}");
					self.record(&path, DiagnosticKind::MalformedData { reason });
				}
				Err(e) => {
					tracing::warn!("could not read pseudopatterns of {rel_path}: {e}");
					self.record(&rel_path, DiagnosticKind::Io {
						reason: e.to_string(),
					});
				}
			}
		}
		variants
	}

	/// Merge local data over global data. Only the first call has an effect.
	fn merge_fragment_data(&mut self, index: usize) {
		let global = &self.registry.data;
		let Some(fragment) = self.registry.patterns().get(index) else {
			return;
		};
		if fragment.all_data.is_some() {
			return;
		}

		let all_data = merge_data(global, &fragment.data);
		if let Some(fragment) = self.registry.get_mut(index) {
			fragment.all_data = Some(all_data);
			fragment.expansion = ExpansionState::DataMerged;
		}
	}

	/// Follow partial references from `start` depth first. Returns the chain
	/// of partial names that leads back to a fragment already on the path.
	pub fn find_cycle(&self, start: usize) -> Option<Vec<String>> {
		let mut path = Vec::new();
		let mut done = HashSet::new();
		self.visit(start, &mut path, &mut done)
	}

	fn visit(
		&self,
		index: usize,
		path: &mut Vec<usize>,
		done: &mut HashSet<usize>,
	) -> Option<Vec<String>> {
		if let Some(position) = path.iter().position(|visited| *visited == index) {
			let chain = path[position..]
				.iter()
				.chain(std::iter::once(&index))
				.map(|visited| self.registry.patterns()[*visited].pattern_partial.clone())
				.collect();
			return Some(chain);
		}
		if done.contains(&index) {
			return None;
		}

		path.push(index);
		for target in self.references_of(index) {
			if let Some(chain) = self.visit(target, path, done) {
				return Some(chain);
			}
		}
		path.pop();
		done.insert(index);

		None
	}

	fn references_of(&self, index: usize) -> Vec<usize> {
		let Some(fragment) = self.registry.get(index) else {
			return Vec::new();
		};
		let Some(engine) = self.engines.for_fragment(fragment) else {
			return Vec::new();
		};
		if !engine.capabilities().expands_partials {
			return Vec::new();
		}

		engine
			.find_partials(&fragment.extended_template)
			.iter()
			.filter_map(|token| self.registry.get_partial_index(&engine.partial_key(token)))
			.collect()
	}

	/// Substitute partials level by level. Each pass rescans the working
	/// template, so references brought in by a substituted partial are handled
	/// by the next pass. Stops once a pass substitutes nothing.
	fn expand_partials(&mut self, index: usize) {
		let mut level = 1;

		loop {
			let Some(fragment) = self.registry.get(index) else {
				return;
			};
			let Some(engine) = self.engines.for_fragment(fragment) else {
				return;
			};
			let rel_path = fragment.rel_path.clone();
			let tokens = engine.find_partials(&fragment.extended_template);

			if let Some(fragment) = self.registry.get_mut(index) {
				fragment.pattern_partials.clone_from(&tokens);
				fragment.expansion = ExpansionState::ReferencesScanned;
			}

			if tokens.is_empty() || !engine.capabilities().expands_partials {
				self.mark_expanded(index);
				return;
			}

			tracing::debug!("found partials for {rel_path} at level {level}");
			self.lineage.find_lineage(index, &mut self.registry, &self.engines);

			let substitution = replace_partials(&self.registry, engine, index, &tokens);
			// Re-entry must not report the same reference twice.
			for name in substitution.unresolved {
				let diagnostic =
					BuildDiagnostic::new(&rel_path, DiagnosticKind::UnresolvedPartial { name });
				if !self.diagnostics.contains(&diagnostic) {
					tracing::warn!("{}: {}", rel_path, diagnostic.message());
					self.diagnostics.push(diagnostic);
				}
			}

			if let Some(fragment) = self.registry.get_mut(index) {
				fragment.list_item_refs = engine.find_list_items(&substitution.text);
				fragment.extended_template = substitution.text;
			}

			if !substitution.changed {
				self.mark_expanded(index);
				return;
			}
			level += 1;
		}
	}

	fn mark_expanded(&mut self, index: usize) {
		if let Some(fragment) = self.registry.get_mut(index) {
			fragment.expansion = ExpansionState::Expanded;
		}
	}
}

struct Substitution {
	text: String,
	changed: bool,
	unresolved: Vec<String>,
}

/// Replace the first occurrence of each token with the referenced
/// fragment's current working template.
fn replace_partials(
	registry: &Registry,
	engine: &dyn PatternEngine,
	index: usize,
	tokens: &[String],
) -> Substitution {
	let mut text = registry.patterns()[index].extended_template.clone();
	let mut changed = false;
	let mut unresolved = Vec::new();

	for token in tokens {
		let key = engine.partial_key(token);
		let Some(found) = registry.get_partial_index(&key) else {
			unresolved.push(key);
			continue;
		};
		if found == index {
			continue;
		}

		let replacement = engine.substitute(token, &registry.patterns()[found].extended_template);
		if let Some(start) = text.find(token.as_str()) {
			text.replace_range(start..start + token.len(), &replacement);
			changed = true;
		}
	}

	Substitution {
		text,
		changed,
		unresolved,
	}
}
