mod common;

use clap::Parser;
use contentkit_cli::Commands;
use contentkit_cli::ContentkitCli;
use contentkit_cli::ListOutputFormat;
use contentkit_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn list_shows_documents_with_path_and_slug() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Page:"))
		.stdout(predicates::str::contains(
			"pages/about.mdx /pages/about (slug: about)",
		))
		.stdout(predicates::str::contains(
			"projects/my-app/index.mdx /projects/my-app (slug: my-app)",
		))
		.stdout(predicates::str::contains("2 document(s)"));

	Ok(())
}

#[test]
fn list_json_filters_by_type() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	let output = common::contentkit_cmd()
		.arg("list")
		.arg("--type")
		.arg("Project")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let documents: Value = serde_json::from_slice(&output)?;
	assert_eq!(
		documents,
		serde_json::json!([{
			"id": "projects/my-app/index.mdx",
			"type": "Project",
			"path": "/projects/my-app",
			"slug": "my-app",
		}])
	);

	Ok(())
}

#[test]
fn list_rejects_unknown_type() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("list")
		.arg("--type")
		.arg("Post")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unknown document type `Post`"));

	Ok(())
}

#[test]
fn info_json_reports_types_and_cache() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	let output = common::contentkit_cmd()
		.arg("info")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let report: Value = serde_json::from_slice(&output)?;
	assert_eq!(report["config"], Value::Null);
	assert_eq!(report["content_dir"], "content");
	assert_eq!(report["documents"], 2);
	assert_eq!(
		report["plugins"],
		serde_json::json!(["slug", "pretty-code", "autolink-headings"])
	);
	assert_eq!(report["document_types"][1]["name"], "Project");
	assert_eq!(report["document_types"][1]["documents"], 1);
	assert_eq!(report["cache"]["exists"], Value::Bool(true));
	assert_eq!(report["cache"]["valid"], Value::Bool(true));
	assert_eq!(report["cache"]["scan_count"], 1);

	Ok(())
}

#[test]
fn info_resolves_dot_config_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), ".config/contentkit.toml", "content_dir = \"docs\"\n")?;
	common::write_file(tmp.path(), "docs/pages/about.mdx", common::ABOUT_PAGE)?;

	common::contentkit_cmd()
		.arg("info")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("contentkit info"))
		.stdout(predicates::str::contains(".config/contentkit.toml"))
		.stdout(predicates::str::contains("1 document(s) from pages/**/*.mdx"));

	Ok(())
}

#[test]
fn list_is_accepted_by_cli_parser() {
	let cli = ContentkitCli::try_parse_from([
		"contentkit",
		"list",
		"--type",
		"Page",
		"--format",
		"json",
	])
	.unwrap_or_else(|e| panic!("failed to parse: {e}"));

	match cli.command {
		Some(Commands::List {
			document_type,
			format,
		}) => {
			assert_eq!(document_type.as_deref(), Some("Page"));
			assert!(matches!(format, ListOutputFormat::Json));
		}
		_ => panic!("expected List command"),
	}
}
