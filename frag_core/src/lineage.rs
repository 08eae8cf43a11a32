use std::fmt;

use crate::EngineSet;
use crate::LineageEntry;
use crate::Registry;

/// Records which fragments a fragment includes, for display only. Lineage
/// never influences expansion.
pub trait LineageRecorder: fmt::Debug {
	fn find_lineage(&self, index: usize, registry: &mut Registry, engines: &EngineSet);
}

/// Records forward lineage on the including fragment and reverse lineage on
/// every fragment it includes.
#[derive(Debug, Clone, Default)]
pub struct ForwardLineage;

impl LineageRecorder for ForwardLineage {
	fn find_lineage(&self, index: usize, registry: &mut Registry, engines: &EngineSet) {
		let Some(fragment) = registry.get(index) else {
			return;
		};
		let Some(engine) = engines.for_fragment(fragment) else {
			return;
		};

		let own = entry_for(&fragment.pattern_partial, &fragment.pattern_link);
		let included: Vec<usize> = fragment
			.pattern_partials
			.iter()
			.filter_map(|token| registry.get_partial_index(&engine.partial_key(token)))
			.filter(|found| *found != index)
			.collect();

		for found in included {
			let Some(target) = registry.get(found) else {
				continue;
			};
			let forward = entry_for(&target.pattern_partial, &target.pattern_link);

			if let Some(fragment) = registry.get_mut(index) {
				if !fragment.lineage_index.contains(&forward.pattern_partial) {
					fragment
						.lineage_index
						.push(forward.pattern_partial.clone());
					fragment.lineage.push(forward);
				}
			}

			if let Some(target) = registry.get_mut(found) {
				if !target.reverse_lineage_index.contains(&own.pattern_partial) {
					target
						.reverse_lineage_index
						.push(own.pattern_partial.clone());
					target.reverse_lineage.push(own.clone());
				}
			}
		}
	}
}

fn entry_for(pattern_partial: &str, pattern_link: &str) -> LineageEntry {
	LineageEntry {
		pattern_partial: pattern_partial.to_string(),
		link: format!("/patterns/{pattern_link}"),
	}
}
