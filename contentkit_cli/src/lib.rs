use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Validate mdx content against typed schemas and generate json records.",
	long_about = "contentkit turns a directory of mdx, markdown, and data files into typed json \
	              records for a static site.\n\nEach file is matched to a document type, its \
	              frontmatter is validated, `path` and `slug` are computed from its location, \
	              and its body is rendered to html.\n\nQuick start:\n  contentkit init   \
	              Create a config and a sample page\n  contentkit build  Generate json \
	              records\n  contentkit check  Verify generated records are up to date\n  \
	              contentkit list   Show documents with their path and slug"
)]
pub struct ContentkitCli {
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

	/// Treat documents whose slug resolves to an empty string as errors.
	#[arg(long, global = true, default_value_t = false)]
	pub deny_empty_slugs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize contentkit in a project.
	///
	/// Writes a commented `contentkit.toml` with the default `Page` and
	/// `Project` schemas and a sample page under `content/pages/`. Existing
	/// files are left untouched.
	Init,
	/// Generate json records for every valid document.
	///
	/// Scans the content directory, reports diagnostics, and writes one
	/// record per document plus per-type and global indexes to the output
	/// directory. Records that no longer correspond to a document are
	/// removed.
	Build {
		/// Report what would be written without touching the output
		/// directory.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch the content directory and rebuild on every change.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that generated records are up to date.
	///
	/// Exits with status 1 when a record is missing, changed, or orphaned,
	/// or when a document fails validation. Ideal for CI pipelines.
	Check {
		/// Show a unified diff for each changed record.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List every valid document with its type, path, and slug.
	List {
		/// Only list documents of this type.
		#[arg(long = "type", value_name = "NAME")]
		document_type: Option<String>,

		/// Output format for the listing.
		#[arg(long, value_enum, default_value_t = ListOutputFormat::Text)]
		format: ListOutputFormat,
	},
	/// Print a summary of the resolved configuration and scanned content.
	///
	/// Shows the config file, content and output directories, document
	/// types with their document counts, diagnostic totals, and the state
	/// of the incremental cache.
	Info {
		/// Output format for info results.
		#[arg(long, value_enum, default_value_t = ListOutputFormat::Text)]
		format: ListOutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each stale entry includes
	/// the file path and why it is stale.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` or `::error`
	/// annotations that appear inline on pull request diffs.
	Github,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListOutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
