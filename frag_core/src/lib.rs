//! `frag_core` assembles a pattern library: a tree of small template files
//! ("fragments") that include one another by name. It discovers every
//! fragment with its data and metadata, resolves partial names, expands
//! includes into self-contained templates and resolves cross-links inside
//! data.
//!
//! ## Build Pipeline
//!
//! ```text
//! Data directory
//!   → global data and list items
//! Pattern tree (sorted walk)
//!   → discovery (identity, sibling .json / .listitems.json / .md, raw template)
//!   → registry (insertion ordered, unique by relative path, link table)
//! All data
//!   → `link.<partial>` tokens rewritten to URLs
//! Every fragment
//!   → pseudopattern variants, merged data, level-by-level partial expansion
//! ```
//!
//! ## Key Types
//!
//! - [`Library`] drives a build and owns everything it produces.
//! - [`Registry`] holds the fragments and resolves partial names with
//!   [`Registry::get_partial`].
//! - [`Fragment`] is one discovered file with its metadata.
//! - [`PatternEngine`] is the seam for template syntaxes. [`MinijinjaEngine`]
//!   is registered by default.
//! - [`FragConfig`] is loaded from `frag.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frag_core::Library;
//!
//! let mut library = Library::load(".").unwrap();
//! library.build().unwrap();
//!
//! for diagnostic in &library.diagnostics {
//!     eprintln!("{}: {}", diagnostic.rel_path, diagnostic.message());
//! }
//!
//! let html = library.render_pattern("atoms-button").unwrap();
//! println!("{html}");
//! ```

pub use config::*;
pub use data::*;
pub use discovery::*;
pub use engine::*;
pub use error::*;
pub use fragment::*;
pub use frontmatter::*;
pub use jinja::*;
pub use library::*;
pub use lineage::*;
pub use list_items::*;
pub use pseudopattern::*;
pub use registry::*;

pub mod config;
mod data;
mod discovery;
mod engine;
#[allow(unused_assignments)]
mod error;
mod expansion;
mod fragment;
mod frontmatter;
mod jinja;
mod library;
mod lineage;
mod list_items;
mod pseudopattern;
mod registry;

#[cfg(test)]
mod __fixtures;
