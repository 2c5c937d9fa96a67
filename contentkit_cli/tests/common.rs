use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const ABOUT_PAGE: &str = "---\ntitle: About\ndescription: Who we are\n---\n\n# About us\n";
pub const PROJECT_INDEX: &str =
	"---\ntitle: My App\ndescription: A small app\ndate: 2024-01-31\n---\n\n## Overview\n";

pub fn contentkit_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("contentkit"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("CONTENTKIT_LOG");
	cmd
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}

/// One page and one project under the default `content/` directory.
#[allow(dead_code)]
pub fn write_sample_project(root: &Path) -> std::io::Result<()> {
	write_file(root, "content/pages/about.mdx", ABOUT_PAGE)?;
	write_file(root, "content/projects/my-app/index.mdx", PROJECT_INDEX)
}
