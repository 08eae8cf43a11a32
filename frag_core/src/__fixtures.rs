use std::path::Path;

use tempfile::TempDir;

use crate::*;

pub fn write_file(root: &Path, rel_path: &str, content: &str) {
	let path = root.join(rel_path);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

/// A temporary project with `files` written below the default pattern root.
pub fn pattern_project(files: &[(&str, &str)]) -> TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	for (rel_path, content) in files {
		write_file(
			tmp.path(),
			&format!("{DEFAULT_PATTERNS_PATH}/{rel_path}"),
			content,
		);
	}
	tmp
}

/// Write a file below the default data directory of `project`.
pub fn write_data(project: &TempDir, file_name: &str, content: &str) {
	write_file(
		project.path(),
		&format!("{DEFAULT_DATA_PATH}/{file_name}"),
		content,
	);
}

/// Load and build the library rooted at `project`.
pub fn built_library(project: &TempDir) -> FragResult<Library> {
	let mut library = Library::load(project.path())?;
	library.build()?;
	Ok(library)
}

/// A fragment handled by the default engine with its template already read.
pub fn jinja_fragment(rel_path: &str, template: &str) -> Fragment {
	let mut fragment = Fragment::new(rel_path);
	fragment.engine = Some(MinijinjaEngine::NAME.to_string());
	fragment.set_template(template);
	fragment.expansion = ExpansionState::MetadataLoaded;
	fragment
}

pub fn registry_with(fragments: Vec<Fragment>) -> Registry {
	let engines = EngineSet::default();
	let mut registry = Registry::new();
	for fragment in fragments {
		registry.add_pattern(fragment, &engines);
	}
	registry
}

/// The fragment registered under `rel_path`, panicking when it is missing.
pub fn fragment<'a>(library: &'a Library, rel_path: &str) -> &'a Fragment {
	library
		.registry
		.find_by_rel_path(rel_path)
		.unwrap_or_else(|| panic!("no fragment registered at {rel_path}"))
}

pub fn diagnostic_kinds(library: &Library) -> Vec<&DiagnosticKind> {
	library
		.diagnostics
		.iter()
		.map(|diagnostic| &diagnostic.kind)
		.collect()
}
