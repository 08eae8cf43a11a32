use std::fmt;
use std::path::Path;

use crate::EngineSet;
use crate::ExpansionState;
use crate::FragError;
use crate::FragResult;
use crate::Fragment;
use crate::Registry;
use crate::get_data_keys;
use crate::is_pseudo_pattern_json;
use crate::merge_data;
use crate::parse_relaxed_json;
use crate::resolve_data_links;

/// Discovers data-only variants of a fragment and registers each one as its
/// own fragment.
pub trait PseudopatternFinder: fmt::Debug {
	/// Register the variants of the fragment at `index`. Each entry is the
	/// registry index of a variant, or the error that prevented one variant
	/// from being registered.
	fn find_pseudopatterns(
		&self,
		index: usize,
		patterns_root: &Path,
		registry: &mut Registry,
		engines: &EngineSet,
	) -> Vec<FragResult<usize>>;
}

/// Finds `<file_name>~<variant>.json` files next to the base template.
///
/// Variant data is merged over the base fragment's local data, so a variant
/// only lists the values it changes.
#[derive(Debug, Clone, Default)]
pub struct SiblingVariants;

impl PseudopatternFinder for SiblingVariants {
	fn find_pseudopatterns(
		&self,
		index: usize,
		patterns_root: &Path,
		registry: &mut Registry,
		engines: &EngineSet,
	) -> Vec<FragResult<usize>> {
		let Some(base) = registry.get(index).cloned() else {
			return Vec::new();
		};

		let dir = patterns_root.join(&base.subdir);
		let entries = match std::fs::read_dir(&dir) {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
			Err(e) => return vec![Err(e.into())],
		};

		let prefix = format!("{}~", base.file_name);
		let mut file_names: Vec<String> = entries
			.filter_map(Result::ok)
			.filter_map(|entry| entry.file_name().to_str().map(str::to_string))
			.filter(|name| name.starts_with(&prefix) && is_pseudo_pattern_json(name))
			.collect();
		file_names.sort();

		file_names
			.iter()
			.map(|file_name| register_variant(&base, &dir, file_name, registry, engines))
			.collect()
	}
}

fn register_variant(
	base: &Fragment,
	dir: &Path,
	file_name: &str,
	registry: &mut Registry,
	engines: &EngineSet,
) -> FragResult<usize> {
	let rel_path = if base.subdir.is_empty() {
		file_name.to_string()
	} else {
		format!("{}/{file_name}", base.subdir)
	};

	let content = std::fs::read_to_string(dir.join(file_name))?;
	let variant_data = parse_relaxed_json(&content).map_err(|reason| {
		FragError::DataFile {
			path: rel_path.clone(),
			reason,
		}
	})?;
	let resolution = resolve_data_links(&merge_data(&base.data, &variant_data), registry.links());
	for token in &resolution.unresolved {
		tracing::debug!("unresolved data link `{token}` in {rel_path}");
	}

	let mut variant = Fragment::new(&rel_path);
	variant.template.clone_from(&base.template);
	variant.extended_template.clone_from(&base.extended_template);
	variant.data_keys = get_data_keys(&resolution.value);
	variant.data = resolution.value;
	variant.list_items.clone_from(&base.list_items);
	variant.engine.clone_from(&base.engine);
	variant.state.clone_from(&base.state);
	variant.pattern_partials.clone_from(&base.pattern_partials);
	variant.style_partials.clone_from(&base.style_partials);
	variant.parameterized_partials.clone_from(&base.parameterized_partials);
	variant.list_item_refs.clone_from(&base.list_item_refs);
	variant.is_pseudo_pattern = true;
	variant.base_pattern = Some(base.pattern_partial.clone());
	variant.expansion = ExpansionState::MetadataLoaded;
	variant.variants_checked = true;

	tracing::debug!(
		"found pseudopattern {} of {}",
		variant.pattern_partial,
		base.pattern_partial
	);

	Ok(registry.add_pattern(variant, engines))
}
