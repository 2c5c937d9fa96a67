//! `contentkit_core` turns a directory of MDX, markdown, and data files into
//! typed JSON records for a static site. Each file is matched to a document
//! type, its frontmatter is validated against the type's fields, `path` and
//! `slug` are derived from its location, and its body is rendered to HTML.
//!
//! ## Processing Pipeline
//!
//! ```text
//! contentkit.toml → ContentConfig → DocumentTypes + Pipeline
//! content dir
//!   → walk (gitignore + exclude patterns)
//!   → match each file to a document type by glob
//!   → parse frontmatter and body (markdown crate, MDX + GFM)
//!   → validate fields, compute `path` and `slug`
//!   → mdast → hast → passes (slug, pretty-code, autolink-headings) → HTML
//!   → Document records → generated JSON
//! ```
//!
//! ## Modules
//!
//! - [`config`]: configuration loading from `contentkit.toml`.
//! - [`schema`]: field types and compiled document types.
//! - [`pipeline`]: parse options and the ordered list of HTML tree passes.
//! - [`pretty_code`]: code block line decoration with pluggable
//!   highlighting.
//!
//! ## Computed fields
//!
//! ```rust
//! use contentkit_core::resolve_path;
//! use contentkit_core::resolve_slug;
//!
//! assert_eq!(resolve_path("pages/about"), "/pages/about");
//! assert_eq!(resolve_slug("pages/about"), "about");
//! assert_eq!(resolve_slug("projects/my-app/notes"), "my-app/notes");
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contentkit_core::compute_outputs;
//! use contentkit_core::ensure_valid;
//! use contentkit_core::scan_project_with_config;
//! use contentkit_core::write_outputs;
//! use std::path::Path;
//!
//! let ctx = scan_project_with_config(Path::new(".")).unwrap();
//! ensure_valid(&ctx).unwrap();
//!
//! let outputs = compute_outputs(&ctx).unwrap();
//! write_outputs(&outputs).unwrap();
//! ```

pub use autolink::AutolinkHeadingsPass;
pub use computed::*;
pub use config::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use heading_slug::HeadingSlugPass;
pub use heading_slug::Slugger;
pub use heading_slug::slugify;
pub use project::*;

mod autolink;
mod computed;
pub mod config;
mod data;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod hast;
mod heading_slug;
mod index_cache;
pub mod pipeline;
pub mod pretty_code;
mod project;
pub mod schema;
mod to_hast;

#[cfg(test)]
mod __fixtures;
