mod common;

use contentkit_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn build_writes_records() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	let mut cmd = common::contentkit_cmd();
	cmd.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Built 2 document(s): 5 file(s) written, 0 unchanged, 0 removed.",
		));

	let generated = tmp.path().join(".contentkit/generated");
	let project: Value = serde_json::from_str(&std::fs::read_to_string(
		generated.join("Project/projects__my-app__index.mdx.json"),
	)?)?;
	assert_eq!(project["path"], "/projects/my-app");
	assert_eq!(project["slug"], "my-app");
	assert_eq!(project["date"], "2024-01-31T00:00:00.000Z");
	assert_eq!(project["_raw"]["sourceFileName"], "index.mdx");

	let index: Value =
		serde_json::from_str(&std::fs::read_to_string(generated.join("index.json"))?)?;
	assert_eq!(index["allPages"], serde_json::json!(["pages/about.mdx"]));

	Ok(())
}

#[test]
fn build_is_idempotent() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	for _ in 0..2 {
		common::contentkit_cmd()
			.arg("build")
			.arg("--path")
			.arg(tmp.path())
			.assert()
			.success();
	}

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("0 file(s) written, 5 unchanged"));

	Ok(())
}

#[test]
fn build_dry_run_does_not_write() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	let mut cmd = common::contentkit_cmd();
	cmd.arg("build")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Dry run: would change 5 file(s):"))
		.stdout(predicates::str::contains(
			"write .contentkit/generated/Page/pages__about.mdx.json",
		));

	assert!(!tmp.path().join(".contentkit/generated").exists());

	Ok(())
}

#[test]
fn build_removes_records_of_deleted_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	std::fs::remove_file(tmp.path().join("content/pages/about.mdx"))?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("1 removed."));

	assert!(
		!tmp.path()
			.join(".contentkit/generated/Page/pages__about.mdx.json")
			.exists()
	);

	Ok(())
}

#[test]
fn build_skips_invalid_documents_with_warning() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	common::write_file(
		tmp.path(),
		"content/projects/half/index.mdx",
		"---\ntitle: Half\n---\n",
	)?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Built 2 document(s)"))
		.stderr(predicates::str::contains("description"));

	Ok(())
}

#[test]
fn build_fails_on_invalid_documents_with_fail_policy() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	common::write_file(
		tmp.path(),
		"contentkit.toml",
		"[validation]\non_missing_or_incompatible_data = \"fail\"\n",
	)?;
	common::write_file(
		tmp.path(),
		"content/projects/half/index.mdx",
		"---\ntitle: Half\n---\n",
	)?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed validation"));

	assert!(!tmp.path().join(".contentkit/generated").exists());

	Ok(())
}

#[test]
fn deny_empty_slugs_flag_rejects_single_segment_paths() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	common::write_file(
		tmp.path(),
		"content/pages/index.mdx",
		"---\ntitle: Pages\n---\n",
	)?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("empty slug"));

	common::contentkit_cmd()
		.arg("build")
		.arg("--deny-empty-slugs")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}

#[test]
fn build_without_content_dir_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("content directory not found"));

	Ok(())
}

#[test]
fn build_rejects_project_root_as_output_dir() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	common::write_file(tmp.path(), "contentkit.toml", "output_dir = \".\"\n")?;
	common::write_file(tmp.path(), "package.json", "{}\n")?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("invalid output directory"));

	assert!(tmp.path().join("package.json").is_file());

	Ok(())
}

#[test]
fn build_writes_project_cache_artifact() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let cache_path = tmp
		.path()
		.join(".contentkit")
		.join("cache")
		.join("index-v1.json");
	assert!(
		cache_path.is_file(),
		"expected cache file at {}",
		cache_path.display()
	);

	Ok(())
}
