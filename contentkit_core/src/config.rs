use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::ContentError;
use crate::ContentResult;
use crate::project::is_ignored_name;
use crate::schema::ContentType;
use crate::schema::DocumentTypeConfig;
use crate::schema::DocumentTypes;
use crate::schema::FieldDef;
use crate::schema::FieldType;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"contentkit.toml",
	".contentkit.toml",
	".config/contentkit.toml",
];

pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_OUTPUT_DIR: &str = ".contentkit/generated";

/// A commented config equivalent to [`ContentConfig::default`], written by
/// `contentkit init`.
pub const SAMPLE_CONFIG: &str = r#"# contentkit configuration
content_dir = "content"
output_dir = ".contentkit/generated"

[validation]
# skip | skip-warn | fail
on_missing_or_incompatible_data = "skip-warn"
# ignore | warn | fail
on_extra_field_data = "warn"

[[document_types]]
name = "Page"
file_path_pattern = "pages/**/*.mdx"
content_type = "mdx"
computed_fields = ["path", "slug"]

[document_types.fields.title]
type = "string"
required = true
description = "The title of the page"

[document_types.fields.description]
type = "string"
description = "Optional description for the page"

[[document_types]]
name = "Project"
file_path_pattern = "./projects/**/*.mdx"
content_type = "mdx"
computed_fields = ["path", "slug"]

[document_types.fields.published]
type = "boolean"
description = "If the project is published"

[document_types.fields.title]
type = "string"
required = true
description = "The title of the project"

[document_types.fields.description]
type = "string"
required = true
description = "The description of the project"

[document_types.fields.date]
type = "date"
description = "The date the project was created"

[document_types.fields.url]
type = "string"
description = "URL of the project"

[document_types.fields.repository]
type = "string"
description = "Repository URL"

[markdown]
remark_plugins = ["gfm"]
rehype_plugins = ["slug", "pretty-code", "autolink-headings"]

[markdown.pretty_code]
theme = "github-dark"
empty_line_placeholder = " "
highlighted_line_class = "line--highlighted"
highlighted_word_class = "word--highlighted"

[markdown.autolink_headings]
behavior = "prepend"
class_name = ["subheading-anchor"]
aria_label = "Link to section"
"#;

/// Configuration loaded from a `contentkit.toml` file.
///
/// Every section is optional. A missing `[[document_types]]` list falls back
/// to the built-in `Page` and `Project` schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentConfig {
	/// Root of the content tree, relative to the project root.
	#[serde(default = "default_content_dir")]
	pub content_dir: PathBuf,
	/// Where generated records are written, relative to the project root.
	#[serde(default = "default_output_dir")]
	pub output_dir: PathBuf,
	/// Files larger than this are rejected. Defaults to 10 MB.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	#[serde(default)]
	pub validation: ValidationConfig,
	#[serde(default = "default_document_types")]
	pub document_types: Vec<DocumentTypeConfig>,
	#[serde(default)]
	pub markdown: MarkdownConfig,
}

impl Default for ContentConfig {
	fn default() -> Self {
		Self {
			content_dir: default_content_dir(),
			output_dir: default_output_dir(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
			exclude: ExcludeConfig::default(),
			validation: ValidationConfig::default(),
			document_types: default_document_types(),
			markdown: MarkdownConfig::default(),
		}
	}
}

fn default_content_dir() -> PathBuf {
	PathBuf::from(DEFAULT_CONTENT_DIR)
}

fn default_output_dir() -> PathBuf {
	PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

/// The `Page` and `Project` schemas used when no document types are
/// configured.
pub fn default_document_types() -> Vec<DocumentTypeConfig> {
	let page = DocumentTypeConfig {
		name: "Page".to_string(),
		file_path_pattern: "pages/**/*.mdx".to_string(),
		content_type: ContentType::Mdx,
		description: None,
		fields: [
			(
				"title".to_string(),
				FieldDef::new(FieldType::String)
					.required()
					.describe("The title of the page"),
			),
			(
				"description".to_string(),
				FieldDef::new(FieldType::String).describe("Optional description for the page"),
			),
		]
		.into_iter()
		.collect(),
		computed_fields: crate::ComputedField::ALL.to_vec(),
	};

	let project = DocumentTypeConfig {
		name: "Project".to_string(),
		file_path_pattern: "./projects/**/*.mdx".to_string(),
		content_type: ContentType::Mdx,
		description: None,
		fields: [
			(
				"published".to_string(),
				FieldDef::new(FieldType::Boolean).describe("If the project is published"),
			),
			(
				"title".to_string(),
				FieldDef::new(FieldType::String)
					.required()
					.describe("The title of the project"),
			),
			(
				"description".to_string(),
				FieldDef::new(FieldType::String)
					.required()
					.describe("The description of the project"),
			),
			(
				"date".to_string(),
				FieldDef::new(FieldType::Date).describe("The date the project was created"),
			),
			(
				"url".to_string(),
				FieldDef::new(FieldType::String).describe("URL of the project"),
			),
			(
				"repository".to_string(),
				FieldDef::new(FieldType::String).describe("Repository URL"),
			),
		]
		.into_iter()
		.collect(),
		computed_fields: crate::ComputedField::ALL.to_vec(),
	};

	vec![page, project]
}

/// Configuration for excluding files and directories from scanning.
///
/// Patterns follow gitignore syntax, are relative to the project root, and
/// are applied on top of any `.gitignore` rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// What happens to a document with a missing required field or a value of
/// the wrong type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDataPolicy {
	/// Drop the document without reporting it.
	Skip,
	/// Drop the document and report a warning.
	#[default]
	SkipWarn,
	/// Report an error and fail the build.
	Fail,
}

/// What happens when a document carries fields its schema doesn't declare.
/// Extra fields are never emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraFieldPolicy {
	Ignore,
	#[default]
	Warn,
	Fail,
}

/// The `[validation]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
	pub on_missing_or_incompatible_data: MissingDataPolicy,
	pub on_extra_field_data: ExtraFieldPolicy,
	/// Treat documents whose slug resolves to an empty string as errors.
	pub deny_empty_slugs: bool,
}

/// Parse-stage plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RemarkPlugin {
	/// GitHub-flavored markdown: autolink literals, footnotes, strikethrough,
	/// tables, and task lists.
	Gfm,
}

/// Tree-stage passes, run in the order they are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RehypePlugin {
	/// Add GitHub-style `id`s to headings.
	Slug,
	/// Split code blocks into decorated lines.
	PrettyCode,
	/// Add anchor links to headings that have an `id`.
	AutolinkHeadings,
}

impl RehypePlugin {
	pub fn name(self) -> &'static str {
		match self {
			Self::Slug => "slug",
			Self::PrettyCode => "pretty-code",
			Self::AutolinkHeadings => "autolink-headings",
		}
	}
}

/// The `[markdown]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
	pub remark_plugins: Vec<RemarkPlugin>,
	pub rehype_plugins: Vec<RehypePlugin>,
	pub pretty_code: PrettyCodeConfig,
	pub autolink_headings: AutolinkHeadingsConfig,
}

impl Default for MarkdownConfig {
	fn default() -> Self {
		Self {
			remark_plugins: vec![RemarkPlugin::Gfm],
			rehype_plugins: vec![
				RehypePlugin::Slug,
				RehypePlugin::PrettyCode,
				RehypePlugin::AutolinkHeadings,
			],
			pretty_code: PrettyCodeConfig::default(),
			autolink_headings: AutolinkHeadingsConfig::default(),
		}
	}
}

impl MarkdownConfig {
	pub fn gfm(&self) -> bool {
		self.remark_plugins.contains(&RemarkPlugin::Gfm)
	}
}

/// Options for the code block pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrettyCodeConfig {
	/// Theme name recorded as `data-theme` on code blocks.
	pub theme: String,
	/// Text inserted into lines that would otherwise have no children.
	pub empty_line_placeholder: String,
	/// Class appended to highlighted lines.
	pub highlighted_line_class: String,
	/// Class that replaces the classes of highlighted words.
	pub highlighted_word_class: String,
}

impl Default for PrettyCodeConfig {
	fn default() -> Self {
		Self {
			theme: "github-dark".to_string(),
			empty_line_placeholder: " ".to_string(),
			highlighted_line_class: "line--highlighted".to_string(),
			highlighted_word_class: "word--highlighted".to_string(),
		}
	}
}

/// Where the anchor goes relative to its heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutolinkBehavior {
	/// First child of the heading.
	#[default]
	Prepend,
	/// Last child of the heading.
	Append,
	/// The anchor wraps the heading's content.
	Wrap,
	/// Sibling before the heading.
	Before,
	/// Sibling after the heading.
	After,
}

/// Options for the heading anchor pass.
///
/// When both `class_name` and `aria_label` are empty the anchor is hidden
/// from assistive technology with `aria-hidden="true"` and `tabindex="-1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutolinkHeadingsConfig {
	pub behavior: AutolinkBehavior,
	pub class_name: Vec<String>,
	pub aria_label: String,
}

impl Default for AutolinkHeadingsConfig {
	fn default() -> Self {
		Self {
			behavior: AutolinkBehavior::Prepend,
			class_name: vec!["subheading-anchor".to_string()],
			aria_label: "Link to section".to_string(),
		}
	}
}

impl ContentConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> ContentResult<Option<ContentConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;
		config.validate_layout(root)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Load the discovered config or fall back to the built-in defaults.
	pub fn load_or_default(root: &Path) -> ContentResult<ContentConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse a config from TOML text and validate its document types.
	pub fn from_toml(content: &str) -> ContentResult<ContentConfig> {
		let config: ContentConfig =
			toml::from_str(content).map_err(|e| ContentError::ConfigParse(e.to_string()))?;
		DocumentTypes::compile(&config.document_types)?;
		Ok(config)
	}

	/// Check that the output directory is owned by contentkit alone. It must
	/// not be the project root or one of its ancestors, and must not overlap
	/// the content directory unless the scan skips it (e.g. a hidden
	/// directory inside the content).
	pub fn validate_layout(&self, root: &Path) -> ContentResult<()> {
		let root = normalize_path(&root.canonicalize().unwrap_or_else(|_| root.to_path_buf()));
		let output_root = normalize_path(&root.join(&self.output_dir));
		let content_root = normalize_path(&root.join(&self.content_dir));
		let invalid = |reason: &str| -> ContentResult<()> {
			Err(ContentError::InvalidOutputDir {
				path: self.output_dir.display().to_string(),
				reason: reason.to_string(),
			})
		};

		if root.starts_with(&output_root) {
			return invalid("it contains the project root");
		}
		if content_root.starts_with(&output_root) {
			return invalid("it contains the content directory");
		}
		if let Ok(inside_content) = output_root.strip_prefix(&content_root) {
			let skipped_by_scan = inside_content
				.components()
				.any(|component| is_ignored_name(&component.as_os_str().to_string_lossy()));
			if !skipped_by_scan {
				return invalid("it is inside the content directory");
			}
		}

		Ok(())
	}

	/// Absolute path of the content directory.
	pub fn content_root(&self, root: &Path) -> PathBuf {
		root.join(&self.content_dir)
	}

	/// Absolute path of the generated output directory.
	pub fn output_root(&self, root: &Path) -> PathBuf {
		root.join(&self.output_dir)
	}

	/// A stable key that changes whenever any setting that affects
	/// processing changes.
	pub fn fingerprint(&self) -> String {
		serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
	}
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
					normalized.pop();
				} else if !normalized.has_root() {
					normalized.push(component);
				}
			}
			other => normalized.push(other),
		}
	}
	normalized
}
