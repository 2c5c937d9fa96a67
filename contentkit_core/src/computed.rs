use serde::Deserialize;
use serde::Serialize;

/// A field derived from a document's source location instead of its
/// frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ComputedField {
	/// Site-relative URL, see [`resolve_path`].
	Path,
	/// Location without its top-level category segment, see [`resolve_slug`].
	Slug,
}

impl ComputedField {
	/// Every computed field, in output order.
	pub const ALL: [ComputedField; 2] = [ComputedField::Path, ComputedField::Slug];

	/// The key this field is emitted under in a document record.
	pub fn name(self) -> &'static str {
		match self {
			Self::Path => "path",
			Self::Slug => "slug",
		}
	}

	/// Resolve the value of this field for a flattened path.
	pub fn resolve(self, flattened_path: &str) -> String {
		match self {
			Self::Path => resolve_path(flattened_path),
			Self::Slug => resolve_slug(flattened_path),
		}
	}
}

impl std::fmt::Display for ComputedField {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Returns the site-relative URL for a relative content path.
///
/// ```rust
/// use contentkit_core::resolve_path;
///
/// assert_eq!(resolve_path("pages/about.mdx"), "/pages/about.mdx");
/// ```
pub fn resolve_path(relative_path: &str) -> String {
	format!("/{relative_path}")
}

/// Drops the first segment of a relative content path.
///
/// A path with a single segment resolves to an empty string. Callers that
/// ingest documents flag that case instead of publishing an empty slug
/// silently.
///
/// ```rust
/// use contentkit_core::resolve_slug;
///
/// assert_eq!(resolve_slug("projects/my-app/index.mdx"), "my-app/index.mdx");
/// assert_eq!(resolve_slug("about"), "");
/// ```
pub fn resolve_slug(relative_path: &str) -> String {
	relative_path
		.split('/')
		.skip(1)
		.collect::<Vec<_>>()
		.join("/")
}

/// Normalize a content-root-relative source path into the location the
/// resolvers work on: `/` separators, no extension, and no trailing `index`
/// segment.
///
/// `projects/my-app/index.mdx` flattens to `projects/my-app` and a root
/// `index.mdx` flattens to the empty string.
pub fn flattened_path(source_file_path: &str) -> String {
	let normalized = source_file_path.replace('\\', "/");
	let normalized = normalized.trim_start_matches("./");
	let without_extension = match normalized.rfind('.') {
		Some(dot) if !normalized[dot..].contains('/') && dot > 0 => &normalized[..dot],
		_ => normalized,
	};

	if without_extension == "index" {
		return String::new();
	}

	without_extension
		.strip_suffix("/index")
		.unwrap_or(without_extension)
		.to_string()
}
