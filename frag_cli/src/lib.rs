use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Assemble a pattern library from a tree of template fragments.",
	long_about = "frag discovers template fragments below a pattern directory, reads their \
	              sibling data and markdown, expands partial includes into self-contained \
	              templates and resolves `link.*` references inside data.\n\nQuick start:\n  \
	              frag build            Discover and expand every pattern\n  frag resolve \
	              NAME     Show which file a partial name points to\n  frag render NAME      \
	              Render one pattern with its data"
)]
pub struct FragCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Discover, link and expand every pattern in the project.
	///
	/// Prints one line per pattern with its partial name, state and expansion
	/// state, followed by any diagnostics. Problems never stop the build; use
	/// `--strict` to exit with a non-zero status when any diagnostic is found.
	Build {
		/// Output format for build results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Treat every diagnostic as an error.
		#[arg(long, default_value_t = false)]
		strict: bool,
	},
	/// Show which pattern a partial name resolves to.
	///
	/// Accepts anything a template include accepts: the partial name, the
	/// legacy `group-filename` form, a relative path or a fuzzy name.
	Resolve {
		/// The partial name to resolve.
		name: String,
	},
	/// Render one pattern with its merged data and print the markup.
	Render {
		/// Partial name or relative path of the pattern.
		name: String,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
