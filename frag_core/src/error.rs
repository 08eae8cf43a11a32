use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum FragError {
	#[error(transparent)]
	#[diagnostic(code(frag::io_error))]
	Io(#[from] std::io::Error),

	#[error("failure to load markdown: {0}")]
	#[diagnostic(code(frag::markdown))]
	Markdown(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(frag::config_parse),
		help("check that frag.toml is valid TOML with [paths], [exclude] and/or [pattern_states] sections")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(frag::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(frag::unsupported_format),
		help("supported formats: json, json5, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(frag::template_render))]
	TemplateRender(String),

	#[error("cyclic partial reference while expanding `{pattern}`: {}", chain.join(" -> "))]
	#[diagnostic(
		code(frag::cyclic_reference),
		help("a pattern cannot include itself, directly or through other partials")
	)]
	CyclicReference { pattern: String, chain: Vec<String> },

	#[error("no pattern found for `{0}`")]
	#[diagnostic(
		code(frag::unknown_pattern),
		help("run `frag build` to list the partial names known to the library")
	)]
	UnknownPattern(String),

	#[error("no template engine available for `{0}`")]
	#[diagnostic(code(frag::no_engine))]
	NoEngine(String),
}

pub type FragResult<T> = Result<T, FragError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
