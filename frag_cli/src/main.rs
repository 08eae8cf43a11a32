use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use frag_cli::Commands;
use frag_cli::FragCli;
use frag_cli::OutputFormat;
use frag_core::EscalationOptions;
use frag_core::FragConfig;
use frag_core::FragError;
use frag_core::Library;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
	let args = FragCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let root = resolve_root(&args);
	let config = match FragConfig::load_or_default(&root) {
		Ok(config) => config,
		Err(e) => exit_with_error(e.into()),
	};
	init_tracing(args.verbose || config.debug, use_color);
	let library = Library::new(root, config);

	let result = match &args.command {
		Some(Commands::Build { format, strict }) => run_build(library, *format, *strict),
		Some(Commands::Resolve { name }) => run_resolve(library, name),
		Some(Commands::Render { name }) => run_render(library, name),
		None => {
			eprintln!("No subcommand specified. Run `frag --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		exit_with_error(e);
	}
}

fn exit_with_error(e: Box<dyn std::error::Error>) -> ! {
	// Render through miette for error codes and help text.
	match e.downcast::<FragError>() {
		Ok(frag_err) => {
			let report: miette::Report = (*frag_err).into();
			eprintln!("{report:?}");
		}
		Err(e) => {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
	process::exit(2);
}

/// Library logs go to stderr so command output stays machine readable.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_filter = if verbose {
		"frag_core=debug"
	} else {
		"frag_core=warn"
	};

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
		.with(
			tracing_subscriber::fmt::layer()
				.with_writer(std::io::stderr)
				.with_ansi(use_color)
				.with_target(false),
		)
		.init();
}

fn resolve_root(args: &FragCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_build(mut library: Library, format: OutputFormat, strict: bool) -> CliResult {
	library.build()?;

	let options = if strict {
		EscalationOptions::strict()
	} else {
		EscalationOptions::default()
	};
	let errors = library.errors(&options).len();

	match format {
		OutputFormat::Text => {
			for fragment in library.registry.patterns() {
				let state = if fragment.state.is_empty() {
					"-"
				} else {
					fragment.state.as_str()
				};
				println!(
					"{:<40} {:<12} {:?}",
					fragment.pattern_partial, state, fragment.expansion
				);
			}

			for diagnostic in &library.diagnostics {
				let label = if diagnostic.is_error(&options) {
					colored!("error:", red)
				} else {
					colored!("warning:", yellow)
				};
				println!("{label} {}: {}", diagnostic.rel_path, diagnostic.message());
			}

			let summary = format!(
				"Built {} pattern(s) and {} subtype index(es) with {} diagnostic(s).",
				library.registry.len(),
				library.registry.subtype_patterns().len(),
				library.diagnostics.len()
			);
			println!();
			if errors == 0 {
				println!("{}", colored!(summary, green));
			} else {
				println!("{}", colored!(summary, bold));
			}
		}
		OutputFormat::Json => {
			let diagnostics: Vec<serde_json::Value> = library
				.diagnostics
				.iter()
				.map(|diagnostic| {
					serde_json::json!({
						"file": diagnostic.rel_path,
						"kind": diagnostic.kind,
						"message": diagnostic.message(),
						"error": diagnostic.is_error(&options),
					})
				})
				.collect();
			let subtypes: Vec<&String> = library.registry.subtype_patterns().keys().collect();
			let output = serde_json::json!({
				"ok": errors == 0,
				"patterns": library.registry.patterns(),
				"subtypes": subtypes,
				"links": library.registry.links(),
				"diagnostics": diagnostics,
			});
			println!("{}", serde_json::to_string_pretty(&output)?);
		}
	}

	if errors > 0 {
		process::exit(1);
	}

	Ok(())
}

fn run_resolve(mut library: Library, name: &str) -> CliResult {
	library.build()?;

	let Some(fragment) = library.registry.get_partial(name) else {
		eprintln!("{} could not resolve `{name}`", colored!("error:", red));
		process::exit(1);
	};

	println!(
		"{} {}",
		colored!(fragment.pattern_partial.as_str(), bold),
		fragment.rel_path
	);
	if let Some(link) = library.registry.link(&fragment.pattern_partial) {
		println!("  link: {link}");
	}

	Ok(())
}

fn run_render(mut library: Library, name: &str) -> CliResult {
	library.build()?;
	let rendered = library.render_pattern(name)?;
	println!("{rendered}");

	Ok(())
}
