mod common;

use clap::Parser;
use contentkit_cli::Commands;
use contentkit_cli::ContentkitCli;
use contentkit_cli::OutputFormat;
use contentkit_core::AnyEmptyResult;
use serde_json::Value;

fn build(root: &std::path::Path) {
	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(root)
		.assert()
		.success();
}

#[test]
fn check_fails_before_build() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("stale records: 5"))
		.stderr(predicates::str::contains("Run `contentkit build` to fix."));

	Ok(())
}

#[test]
fn check_passes_after_build() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	build(tmp.path());

	common::contentkit_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("up to date"));

	Ok(())
}

#[test]
fn check_reports_changed_records_with_diff() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	build(tmp.path());

	common::write_file(
		tmp.path(),
		"content/pages/about.mdx",
		"---\ntitle: About again\n---\n\n# About us\n",
	)?;

	common::contentkit_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains(
			".contentkit/generated/Page/pages__about.mdx.json (out of date)",
		))
		.stderr(predicates::str::contains("+  \"title\": \"About again\""));

	Ok(())
}

#[test]
fn check_reports_orphaned_records() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	build(tmp.path());
	common::write_file(
		tmp.path(),
		".contentkit/generated/Page/pages__old.mdx.json",
		"{}\n",
	)?;

	common::contentkit_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("pages__old.mdx.json (orphaned)"));

	Ok(())
}

#[test]
fn check_json_lists_stale_records() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	let output = common::contentkit_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.get_output()
		.stdout
		.clone();

	let report: Value = serde_json::from_slice(&output)?;
	assert_eq!(report["ok"], Value::Bool(false));
	assert_eq!(report["errors"], 0);
	let stale = report["stale"]
		.as_array()
		.unwrap_or_else(|| panic!("expected stale array"));
	assert_eq!(stale.len(), 5);
	assert!(stale.iter().all(|entry| entry["kind"] == "missing"));

	Ok(())
}

#[test]
fn check_github_emits_annotations() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("check")
		.arg("--format")
		.arg("github")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains(
			"::warning file=.contentkit/generated/index.json::Generated record is missing",
		));

	Ok(())
}

#[test]
fn check_fails_on_invalid_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	build(tmp.path());
	common::write_file(
		tmp.path(),
		"contentkit.toml",
		"[validation]\non_extra_field_data = \"fail\"\n",
	)?;
	common::write_file(
		tmp.path(),
		"content/pages/about.mdx",
		"---\ntitle: About\ndescription: Who we are\ndraft: true\n---\n\n# About us\n",
	)?;

	common::contentkit_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("invalid documents: 1"))
		.stderr(predicates::str::contains("extra_field"));

	Ok(())
}

#[test]
fn check_format_is_accepted_by_cli_parser() {
	let cli = ContentkitCli::try_parse_from(["contentkit", "check", "--diff", "--format", "github"])
		.unwrap_or_else(|e| panic!("failed to parse: {e}"));

	match cli.command {
		Some(Commands::Check { diff, format }) => {
			assert!(diff);
			assert!(matches!(format, OutputFormat::Github));
		}
		_ => panic!("expected Check command"),
	}
}

#[test]
fn global_flags_are_accepted_after_subcommand() {
	let cli = ContentkitCli::try_parse_from([
		"contentkit",
		"build",
		"--watch",
		"--deny-empty-slugs",
		"--no-color",
	])
	.unwrap_or_else(|e| panic!("failed to parse: {e}"));

	assert!(cli.deny_empty_slugs);
	assert!(cli.no_color);
	assert!(matches!(
		cli.command,
		Some(Commands::Build {
			dry_run: false,
			watch: true,
		})
	));
}
