mod common;

use contentkit_core::AnyEmptyResult;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let mut cmd = common::contentkit_cmd();
	cmd.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created contentkit.toml"))
		.stdout(predicates::str::contains("Next steps:"));

	let config = std::fs::read_to_string(tmp.path().join("contentkit.toml"))?;
	assert!(config.contains("[[document_types]]"));
	assert!(tmp.path().join("content/pages/welcome.mdx").is_file());

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let custom = "content_dir = \"site\"\n";
	common::write_file(tmp.path(), "contentkit.toml", custom)?;

	let mut cmd = common::contentkit_cmd();
	cmd.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert_eq!(
		std::fs::read_to_string(tmp.path().join("contentkit.toml"))?,
		custom
	);
	assert!(tmp.path().join("site/pages/welcome.mdx").is_file());
	assert!(!tmp.path().join("content").exists());

	Ok(())
}

#[test]
fn init_keeps_existing_content() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_sample_project(tmp.path())?;
	common::write_file(tmp.path(), "content/pages/welcome.mdx", "---\ntitle: Mine\n---\n")?;

	let mut cmd = common::contentkit_cmd();
	cmd.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Sample page already exists"));

	assert_eq!(
		std::fs::read_to_string(tmp.path().join("content/pages/welcome.mdx"))?,
		"---\ntitle: Mine\n---\n"
	);

	Ok(())
}

#[test]
fn initialized_project_builds() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::contentkit_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::contentkit_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Built 1 document(s)"));

	let record = std::fs::read_to_string(
		tmp.path()
			.join(".contentkit/generated/Page/pages__welcome.mdx.json"),
	)?;
	let record: serde_json::Value = serde_json::from_str(&record)?;
	assert_eq!(record["slug"], "welcome");

	Ok(())
}
