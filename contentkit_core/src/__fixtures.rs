use std::path::Path;

use tempfile::TempDir;

use crate::ContentConfig;
use crate::pipeline::Pipeline;
use crate::schema::DocumentType;
use crate::schema::DocumentTypes;

pub const ABOUT_PAGE: &str = r"---
title: About
description: Who we are
---

# About us

We build things.
";

pub const PROJECT_INDEX: &str = r"---
title: My App
description: A small app
date: 2024-01-31
published: true
url: https://example.com
---

## Overview

Some text.
";

pub const PROJECT_WITHOUT_DESCRIPTION: &str = r"---
title: Half done
---

Missing a description.
";

pub const PAGE_WITHOUT_DESCRIPTION: &str = r"---
title: Contact
---

Reach us anytime.
";

pub const CODE_BLOCK: &str = r#"```js title="example.js" {2} /foo/
const a = 1;

foo();
```
"#;

pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {relative}: {e}"));
}

/// A project using the default configuration with one page and one project.
pub fn sample_project() -> TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_file(tmp.path(), "content/pages/about.mdx", ABOUT_PAGE);
	write_file(tmp.path(), "content/projects/my-app/index.mdx", PROJECT_INDEX);
	tmp
}

pub fn default_types() -> DocumentTypes {
	DocumentTypes::compile(&ContentConfig::default().document_types)
		.unwrap_or_else(|e| panic!("compile: {e}"))
}

pub fn page_type() -> DocumentType {
	default_types()
		.get("Page")
		.cloned()
		.unwrap_or_else(|| panic!("missing Page type"))
}

pub fn project_type() -> DocumentType {
	default_types()
		.get("Project")
		.cloned()
		.unwrap_or_else(|| panic!("missing Project type"))
}

pub fn render_mdx(source: &str) -> String {
	Pipeline::default()
		.render_source(source, crate::schema::ContentType::Mdx, "test.mdx")
		.unwrap_or_else(|e| panic!("render: {e}"))
}
