use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use contentkit_cli::Commands;
use contentkit_cli::ContentkitCli;
use contentkit_cli::ListOutputFormat;
use contentkit_cli::OutputFormat;
use contentkit_core::CheckResult;
use contentkit_core::ContentConfig;
use contentkit_core::ContentError;
use contentkit_core::DiagnosticKind;
use contentkit_core::ProjectContext;
use contentkit_core::ProjectDiagnostic;
use contentkit_core::SAMPLE_CONFIG;
use contentkit_core::ScanOptions;
use contentkit_core::Severity;
use contentkit_core::StaleEntry;
use contentkit_core::StaleKind;
use contentkit_core::check_outputs;
use contentkit_core::compute_outputs;
use contentkit_core::ensure_valid;
use contentkit_core::inspect_project_cache;
use contentkit_core::scan_project_with_config;
use contentkit_core::write_outputs;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `contentkit_core=debug`.
const LOG_ENV: &str = "CONTENTKIT_LOG";

const SAMPLE_PAGE_PATH: &str = "pages/welcome.mdx";
const SAMPLE_PAGE: &str = "---\ntitle: Welcome\ndescription: Your first contentkit page\n---\n\n# \
                           Welcome\n\nEdit this file and run `contentkit build`.\n";

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
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

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = ContentkitCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Build { dry_run, watch }) => run_build(&args, *dry_run, *watch),
		Some(Commands::Check { diff, format }) => run_check(&args, *diff, *format),
		Some(Commands::List {
			document_type,
			format,
		}) => run_list(&args, document_type.as_deref(), *format),
		Some(Commands::Info { format }) => run_info(&args, *format),
		None => {
			eprintln!("No subcommand specified. Run `contentkit --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<ContentError>() {
			Ok(content_err) => {
				let report: miette::Report = (*content_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn init_tracing(verbose: bool) {
	let filter = EnvFilter::try_from_env(LOG_ENV)
		.unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(color_enabled())
		.try_init();
}

fn resolve_root(args: &ContentkitCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn print_section(title: &str) {
	println!();
	println!("{}", colored!(title, bold));
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("{label:<28} {value}");
}

fn run_init(args: &ContentkitCli) -> CliResult<()> {
	let root = resolve_root(args);
	let config_path = root.join("contentkit.toml");
	let config_exists = ContentConfig::resolve_path(&root).is_some();

	if config_exists {
		println!("Config file already exists.");
	} else {
		std::fs::write(&config_path, SAMPLE_CONFIG)?;
		println!("Created contentkit.toml");
	}

	let config = ContentConfig::load_or_default(&root)?;
	let page_path = config.content_root(&root).join(SAMPLE_PAGE_PATH);
	let page_exists = page_path.exists();

	if page_exists {
		println!("Sample page already exists: {}", page_path.display());
	} else {
		if let Some(parent) = page_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&page_path, SAMPLE_PAGE)?;
		println!("Created sample page: {}", page_path.display());
	}

	if !page_exists {
		println!();
		println!("Next steps:");
		println!("  1. Describe your document types in contentkit.toml");
		println!(
			"  2. Add content under {}",
			make_relative(&config.content_root(&root), &root)
		);
		println!("  3. Run `contentkit build` to generate json records");
	}

	Ok(())
}

/// Scan the project, apply CLI validation flags, and print every reported
/// diagnostic to stderr.
fn scan_and_report(args: &ContentkitCli) -> CliResult<ProjectContext> {
	let root = resolve_root(args);
	let mut ctx = scan_project_with_config(&root)?;
	ctx.validation.deny_empty_slugs |= args.deny_empty_slugs;

	if args.verbose {
		println!(
			"Scanned content: {} document(s) from {} file(s), {} reused from cache",
			ctx.project.documents.len(),
			ctx.stats.total_files,
			ctx.stats.reused_files
		);
	}

	for (severity, diag) in ctx.reported_diagnostics() {
		let rel = diagnostic_path(&ctx, diag);
		let report = diagnostic_to_report(diag, &rel, severity == Severity::Error);
		eprintln!("{report:?}");
	}

	Ok(ctx)
}

fn run_build(args: &ContentkitCli, dry_run: bool, watch: bool) -> CliResult<()> {
	run_build_once(args, dry_run)?;

	if !watch || dry_run {
		return Ok(());
	}

	watch_content(args, "building", || run_build_once(args, false))
}

fn run_build_once(args: &ContentkitCli, dry_run: bool) -> CliResult<()> {
	let ctx = scan_and_report(args)?;
	ensure_valid(&ctx)?;
	let root = resolve_root(args);
	let outputs = compute_outputs(&ctx)?;

	if dry_run {
		let check = check_outputs(&ctx, &outputs)?;
		if check.stale.is_empty() {
			println!(
				"All generated records are already up to date ({} document(s)).",
				outputs.document_count
			);
			return Ok(());
		}

		println!("Dry run: would change {} file(s):", check.stale.len());
		for entry in sorted_stale_entries(&check, &root) {
			let action = match entry.kind {
				StaleKind::Missing | StaleKind::Changed => "write",
				StaleKind::Orphaned => "remove",
			};
			println!("  {action} {}", make_relative(&entry.file, &root));
		}
		return Ok(());
	}

	let result = write_outputs(&outputs)?;
	println!(
		"Built {} document(s): {} file(s) written, {} unchanged, {} removed.",
		outputs.document_count,
		result.written.len(),
		result.unchanged,
		result.removed.len()
	);

	if args.verbose {
		for path in &result.written {
			println!("  wrote {}", make_relative(path, &root));
		}
		for path in &result.removed {
			println!("  removed {}", make_relative(path, &root));
		}
	}

	Ok(())
}

fn run_check(args: &ContentkitCli, show_diff: bool, format: OutputFormat) -> CliResult<()> {
	let ctx = scan_and_report(args)?;
	let root = resolve_root(args);
	let outputs = compute_outputs(&ctx)?;
	let result = check_outputs(&ctx, &outputs)?;

	if result.is_ok() {
		match format {
			OutputFormat::Json => {
				println!("{{\"ok\":true,\"stale\":[],\"errors\":0}}");
			}
			OutputFormat::Github => {
				println!("All generated records are up to date.");
			}
			OutputFormat::Text => {
				println!("Check passed: all generated records are up to date.");
			}
		}
		return Ok(());
	}

	match format {
		OutputFormat::Json => {
			let stale_entries: Vec<serde_json::Value> = sorted_stale_entries(&result, &root)
				.into_iter()
				.map(|entry| {
					serde_json::json!({
						"file": make_relative(&entry.file, &root),
						"kind": entry.kind,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"stale": stale_entries,
				"errors": result.error_count,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for (severity, diag) in ctx.reported_diagnostics() {
				if severity == Severity::Error {
					println!(
						"::error file={}::{}",
						diagnostic_path(&ctx, diag),
						diag.message()
					);
				}
			}
			for entry in sorted_stale_entries(&result, &root) {
				println!(
					"::warning file={}::Generated record is {}",
					make_relative(&entry.file, &root),
					stale_label(entry.kind)
				);
			}
			eprintln!("{}", check_summary(&result));
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!("  invalid documents: {}", result.error_count);
			eprintln!("  stale records: {}", result.stale.len());

			let sorted_stale = sorted_stale_entries(&result, &root);
			if !sorted_stale.is_empty() {
				eprintln!();
				eprintln!("Stale records:");
				for entry in sorted_stale {
					eprintln!(
						"  {} ({})",
						make_relative(&entry.file, &root),
						stale_label(entry.kind)
					);

					if show_diff {
						print_diff(
							entry.current_content.as_deref().unwrap_or_default(),
							entry.expected_content.as_deref().unwrap_or_default(),
						);
					}
				}
			}

			eprintln!();
			eprintln!("{}", check_summary(&result));
		}
	}

	process::exit(1);
}

fn stale_label(kind: StaleKind) -> &'static str {
	match kind {
		StaleKind::Missing => "missing",
		StaleKind::Changed => "out of date",
		StaleKind::Orphaned => "orphaned",
	}
}

fn check_summary(result: &CheckResult) -> String {
	let mut parts = Vec::new();
	if result.error_count > 0 {
		parts.push(format!("{} invalid document(s)", result.error_count));
	}
	if !result.stale.is_empty() {
		parts.push(format!(
			"{} generated record(s) are out of date",
			result.stale.len()
		));
	}

	if result.error_count > 0 {
		format!(
			"{}. Fix the reported documents, then run `contentkit build`.",
			parts.join(" and ")
		)
	} else {
		format!("{}. Run `contentkit build` to fix.", parts.join(" and "))
	}
}

fn sorted_stale_entries<'a>(result: &'a CheckResult, root: &Path) -> Vec<&'a StaleEntry> {
	let mut stale_entries: Vec<_> = result.stale.iter().collect();
	stale_entries.sort_by(|a, b| {
		make_relative(&a.file, root)
			.cmp(&make_relative(&b.file, root))
			.then_with(|| a.kind.cmp(&b.kind))
	});
	stale_entries
}

fn run_list(
	args: &ContentkitCli,
	document_type: Option<&str>,
	format: ListOutputFormat,
) -> CliResult<()> {
	let ctx = scan_and_report(args)?;

	if let Some(name) = document_type {
		if !ctx.config.document_types.iter().any(|dt| dt.name == name) {
			return Err(format!("unknown document type `{name}`").into());
		}
	}

	let documents: Vec<_> = ctx
		.project
		.documents
		.iter()
		.filter(|document| document_type.is_none_or(|name| document.document_type == name))
		.collect();

	if let ListOutputFormat::Json = format {
		let entries: Vec<serde_json::Value> = documents
			.iter()
			.map(|document| {
				serde_json::json!({
					"id": document.id,
					"type": document.document_type,
					"path": document.path(),
					"slug": document.slug(),
				})
			})
			.collect();
		println!("{}", serde_json::Value::Array(entries));
		return Ok(());
	}

	if documents.is_empty() {
		println!("No documents found.");
		return Ok(());
	}

	for type_config in &ctx.config.document_types {
		let name = type_config.name.as_str();
		let of_type: Vec<_> = documents
			.iter()
			.filter(|document| document.document_type == name)
			.collect();
		if of_type.is_empty() {
			continue;
		}

		println!("{}", colored!(format!("{name}:"), bold));
		for document in of_type {
			println!(
				"  {} {} (slug: {})",
				document.id,
				document.path().unwrap_or_default(),
				document.slug().unwrap_or_default()
			);
		}
	}

	println!("\n{} document(s)", documents.len());

	Ok(())
}

fn run_info(args: &ContentkitCli, format: ListOutputFormat) -> CliResult<()> {
	let root = resolve_root(args);
	let mut ctx = scan_project_with_config(&root)?;
	ctx.validation.deny_empty_slugs |= args.deny_empty_slugs;
	let cache = inspect_project_cache(&root, &ctx.config, &ScanOptions::from_config(&ctx.config));

	let reported = ctx.reported_diagnostics();
	let diagnostics_errors = reported
		.iter()
		.filter(|(severity, _)| *severity == Severity::Error)
		.count();
	let diagnostics_warnings = reported.len().saturating_sub(diagnostics_errors);

	let type_counts: Vec<(&str, &str, usize)> = ctx
		.config
		.document_types
		.iter()
		.map(|dt| {
			(
				dt.name.as_str(),
				dt.file_path_pattern.as_str(),
				ctx.project.documents_of_type(&dt.name).count(),
			)
		})
		.collect();

	let resolved_config = ctx
		.config_path
		.as_ref()
		.map_or_else(|| "none (defaults)".to_string(), |path| make_relative(path, &root));

	if let ListOutputFormat::Json = format {
		let report = serde_json::json!({
			"root": root.display().to_string(),
			"config": ctx.config_path.as_ref().map(|path| make_relative(path, &root)),
			"content_dir": ctx.config.content_dir.display().to_string(),
			"output_dir": ctx.config.output_dir.display().to_string(),
			"plugins": ctx
				.config
				.markdown
				.rehype_plugins
				.iter()
				.map(|plugin| plugin.name())
				.collect::<Vec<_>>(),
			"document_types": type_counts
				.iter()
				.map(|(name, pattern, count)| {
					serde_json::json!({
						"name": name,
						"file_path_pattern": pattern,
						"documents": count,
					})
				})
				.collect::<Vec<_>>(),
			"documents": ctx.project.documents.len(),
			"diagnostics": {
				"total": reported.len(),
				"errors": diagnostics_errors,
				"warnings": diagnostics_warnings,
			},
			"cache": {
				"path": make_relative(&cache.path, &root),
				"exists": cache.exists,
				"valid": cache.valid,
				"project_key_matches": cache.project_key_matches,
				"hash_verification_enabled": cache.hash_verification_enabled,
				"scan_count": cache.scan_count,
				"last_scan_reused_files": ctx.stats.reused_files,
				"last_scan_reprocessed_files": ctx.stats.reprocessed_files,
			},
		});
		println!("{report}");
		return Ok(());
	}

	println!("{}", colored!("contentkit info", bold));

	print_section("Project");
	print_field("Project root", root.display());
	print_field("Resolved config", resolved_config);
	print_field("Content dir", ctx.config.content_dir.display());
	print_field("Output dir", ctx.config.output_dir.display());
	print_field(
		"Passes",
		ctx.config
			.markdown
			.rehype_plugins
			.iter()
			.map(|plugin| plugin.name())
			.collect::<Vec<_>>()
			.join(", "),
	);

	print_section("Document types");
	for (name, pattern, count) in &type_counts {
		println!("{name:<28} {count} document(s) from {pattern}");
	}

	print_section("Diagnostics");
	print_field("Documents", ctx.project.documents.len());
	print_field("Errors", diagnostics_errors);
	print_field("Warnings", diagnostics_warnings);

	print_section("Cache");
	print_field("Artifact", make_relative(&cache.path, &root));
	print_field("Valid", cache.valid && cache.project_key_matches);
	print_field(
		"Hash verification",
		if cache.hash_verification_enabled {
			"enabled"
		} else {
			"disabled"
		},
	);
	print_field(
		"Scans recorded",
		cache
			.scan_count
			.map_or_else(|| "none".to_string(), |count| count.to_string()),
	);

	Ok(())
}

/// Re-run `on_change` after every burst of changes in the content directory.
fn watch_content(
	args: &ContentkitCli,
	action: &str,
	mut on_change: impl FnMut() -> CliResult<()>,
) -> CliResult<()> {
	use notify::Watcher;

	let root = resolve_root(args);
	let content_root = ContentConfig::load_or_default(&root)?.content_root(&root);
	println!(
		"\nWatching {} for changes... (press Ctrl+C to stop)",
		make_relative(&content_root, &root)
	);

	let (tx, rx) = mpsc::channel();
	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;
	watcher.watch(&content_root, notify::RecursiveMode::Recursive)?;
	tracing::debug!(path = %content_root.display(), "watching content");

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, {action}...");
		if let Err(e) = on_change() {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Display path of a diagnostic's file, relative to the project root.
fn diagnostic_path(ctx: &ProjectContext, diag: &ProjectDiagnostic) -> String {
	make_relative(&ctx.content_root().join(&diag.file), &ctx.root)
}

/// Convert a `ProjectDiagnostic` into a `miette::Report` with appropriate
/// severity, error code, and help text for rich terminal display.
fn diagnostic_to_report(diag: &ProjectDiagnostic, rel_path: &str, is_error: bool) -> miette::Report {
	let severity = if is_error {
		miette::Severity::Error
	} else {
		miette::Severity::Warning
	};

	let message = format!("[{rel_path}] {}", diag.message());
	let help: String = match &diag.kind {
		DiagnosticKind::MissingRequiredField { field, .. } => {
			format!("add `{field}` to the frontmatter")
		}
		DiagnosticKind::IncompatibleField {
			field, expected, ..
		} => format!("change `{field}` to a {expected}"),
		DiagnosticKind::ExtraField { field, .. } => {
			format!(
				"declare `{field}` under `[document_types.fields]` or set `on_extra_field_data = \
				 \"ignore\"`"
			)
		}
		DiagnosticKind::EmptySlug { .. } => {
			"move the file below a category directory such as `pages/`".to_string()
		}
		DiagnosticKind::UnmatchedFile => {
			"add a `[[document_types]]` entry whose `file_path_pattern` matches this file, or \
			 exclude it"
				.to_string()
		}
		DiagnosticKind::AmbiguousDocumentType { .. } => {
			"narrow the `file_path_pattern` of the other document types".to_string()
		}
		_ => diag.message(),
	};

	let diag_value = miette::MietteDiagnostic::new(message)
		.with_code(format!("contentkit::{}", diag.code()))
		.with_help(help)
		.with_severity(severity);
	miette::Report::new(diag_value)
}
