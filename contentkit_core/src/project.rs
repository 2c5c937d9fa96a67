use std::collections::BTreeMap;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::ContentError;
use crate::ContentResult;
use crate::ExtraFieldPolicy;
use crate::MissingDataPolicy;
use crate::ValidationConfig;
use crate::config::ContentConfig;
use crate::config::DEFAULT_MAX_FILE_SIZE;
use crate::document::Document;
use crate::document::IngestOutcome;
use crate::document::ingest_document;
use crate::index_cache;
use crate::index_cache::FileFingerprint;
use crate::index_cache::ProjectIndexCache;
use crate::pipeline::Pipeline;
use crate::schema::DocumentTypes;

/// Environment variable that adds a content hash to cache fingerprints.
pub const CACHE_VERIFY_HASH_ENV: &str = "CONTENTKIT_CACHE_VERIFY_HASH";

/// Options for controlling how the content directory is scanned.
#[derive(Debug, Clone)]
pub struct ScanOptions {
	/// Gitignore-style patterns to exclude from scanning.
	pub exclude_patterns: Vec<String>,
	/// Maximum file size to scan in bytes.
	pub max_file_size: u64,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
	/// Whether to include content hashes in file fingerprints for cache
	/// validation.
	pub cache_verify_hash: bool,
	/// Whether to read and write the incremental index cache.
	pub use_cache: bool,
}

impl Default for ScanOptions {
	fn default() -> Self {
		Self {
			exclude_patterns: Vec::new(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
			cache_verify_hash: false,
			use_cache: true,
		}
	}
}

impl ScanOptions {
	pub fn from_config(config: &ContentConfig) -> Self {
		Self {
			exclude_patterns: config.exclude.patterns.clone(),
			max_file_size: config.max_file_size,
			disable_gitignore: config.disable_gitignore,
			cache_verify_hash: std::env::var_os(CACHE_VERIFY_HASH_ENV).is_some(),
			use_cache: true,
		}
	}
}

/// Options deciding how serious each diagnostic is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
	pub on_missing_or_incompatible_data: MissingDataPolicy,
	pub on_extra_field_data: ExtraFieldPolicy,
	/// If true, a document whose slug resolves to `""` is an error.
	pub deny_empty_slugs: bool,
}

impl From<&ValidationConfig> for ValidationOptions {
	fn from(config: &ValidationConfig) -> Self {
		Self {
			on_missing_or_incompatible_data: config.on_missing_or_incompatible_data,
			on_extra_field_data: config.on_extra_field_data,
			deny_empty_slugs: config.deny_empty_slugs,
		}
	}
}

/// The kind of diagnostic produced while ingesting content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DiagnosticKind {
	/// A required field is absent or `null`.
	MissingRequiredField { document_type: String, field: String },
	/// A field's value does not match its declared type.
	IncompatibleField {
		document_type: String,
		field: String,
		expected: String,
		found: String,
	},
	/// A field that the document type does not declare. It is not emitted.
	ExtraField { document_type: String, field: String },
	/// The computed slug is empty, which happens for single-segment paths.
	EmptySlug {
		document_type: String,
		flattened_path: String,
	},
	/// A markdown or MDX file that no document type matches.
	UnmatchedFile,
	/// More than one document type matches a file. The first one is used.
	AmbiguousDocumentType { chosen: String, others: Vec<String> },
	/// The file could not be parsed.
	InvalidContent { reason: String },
}

/// How a diagnostic affects the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Not reported.
	Ignored,
	Warning,
	/// Fails `build` and `check`.
	Error,
}

impl Severity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ignored => "ignored",
			Self::Warning => "warning",
			Self::Error => "error",
		}
	}
}

/// A diagnostic for one content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDiagnostic {
	/// The file, relative to the content directory.
	pub file: PathBuf,
	pub kind: DiagnosticKind,
}

impl ProjectDiagnostic {
	pub fn severity(&self, options: &ValidationOptions) -> Severity {
		match &self.kind {
			DiagnosticKind::MissingRequiredField { .. } | DiagnosticKind::IncompatibleField { .. } => {
				match options.on_missing_or_incompatible_data {
					MissingDataPolicy::Skip => Severity::Ignored,
					MissingDataPolicy::SkipWarn => Severity::Warning,
					MissingDataPolicy::Fail => Severity::Error,
				}
			}
			DiagnosticKind::ExtraField { .. } => {
				match options.on_extra_field_data {
					ExtraFieldPolicy::Ignore => Severity::Ignored,
					ExtraFieldPolicy::Warn => Severity::Warning,
					ExtraFieldPolicy::Fail => Severity::Error,
				}
			}
			DiagnosticKind::EmptySlug { .. } => {
				if options.deny_empty_slugs {
					Severity::Error
				} else {
					Severity::Warning
				}
			}
			DiagnosticKind::UnmatchedFile | DiagnosticKind::AmbiguousDocumentType { .. } => {
				Severity::Warning
			}
			DiagnosticKind::InvalidContent { .. } => Severity::Error,
		}
	}

	/// Check whether this diagnostic should be treated as an error given the
	/// supplied options.
	pub fn is_error(&self, options: &ValidationOptions) -> bool {
		self.severity(options) == Severity::Error
	}

	/// Stable identifier used in machine-readable output.
	pub fn code(&self) -> &'static str {
		match &self.kind {
			DiagnosticKind::MissingRequiredField { .. } => "missing_required_field",
			DiagnosticKind::IncompatibleField { .. } => "incompatible_field",
			DiagnosticKind::ExtraField { .. } => "extra_field",
			DiagnosticKind::EmptySlug { .. } => "empty_slug",
			DiagnosticKind::UnmatchedFile => "unmatched_file",
			DiagnosticKind::AmbiguousDocumentType { .. } => "ambiguous_document_type",
			DiagnosticKind::InvalidContent { .. } => "invalid_content",
		}
	}

	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::MissingRequiredField {
				document_type,
				field,
			} => format!("{document_type} is missing required field `{field}`"),
			DiagnosticKind::IncompatibleField {
				document_type,
				field,
				expected,
				found,
			} => format!("{document_type} field `{field}` expected {expected}, found {found}"),
			DiagnosticKind::ExtraField {
				document_type,
				field,
			} => format!("{document_type} does not declare field `{field}`; it will be dropped"),
			DiagnosticKind::EmptySlug {
				document_type,
				flattened_path,
			} => {
				format!(
					"{document_type} at `{flattened_path}` has an empty slug; move it below a \
					 category directory"
				)
			}
			DiagnosticKind::UnmatchedFile => "no document type matches this file".to_string(),
			DiagnosticKind::AmbiguousDocumentType { chosen, others } => {
				format!(
					"file matches several document types; using `{chosen}` over {}",
					others
						.iter()
						.map(|name| format!("`{name}`"))
						.collect::<Vec<_>>()
						.join(", ")
				)
			}
			DiagnosticKind::InvalidContent { reason } => format!("invalid content: {reason}"),
		}
	}
}

/// The documents and diagnostics of a scanned content directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentProject {
	/// Valid documents sorted by `_id`.
	pub documents: Vec<Document>,
	pub diagnostics: Vec<ProjectDiagnostic>,
}

impl ContentProject {
	/// Documents of one type, in `_id` order.
	pub fn documents_of_type<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Document> + 'a {
		self.documents
			.iter()
			.filter(move |document| document.document_type == name)
	}

	pub fn document(&self, id: &str) -> Option<&Document> {
		self.documents.iter().find(|document| document.id == id)
	}
}

/// How the most recent scan used the index cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
	/// Whether the whole project was reused without reprocessing any file.
	pub full_project_hit: bool,
	pub reused_files: usize,
	pub reprocessed_files: usize,
	pub total_files: usize,
}

/// A scanned project together with the configuration it was scanned with.
///
/// This is the main entry point returned by [`scan_project_with_config`] and
/// consumed by [`check_outputs`](crate::check_outputs) and
/// [`compute_outputs`](crate::compute_outputs).
#[derive(Debug, Clone)]
pub struct ProjectContext {
	pub root: PathBuf,
	pub config: ContentConfig,
	/// The config file, or `None` when the built-in defaults are in use.
	pub config_path: Option<PathBuf>,
	pub validation: ValidationOptions,
	pub project: ContentProject,
	pub stats: ScanStats,
}

impl ProjectContext {
	pub fn content_root(&self) -> PathBuf {
		self.config.content_root(&self.root)
	}

	pub fn output_root(&self) -> PathBuf {
		self.config.output_root(&self.root)
	}

	/// Diagnostics that are reported, paired with their severity.
	pub fn reported_diagnostics(&self) -> Vec<(Severity, &ProjectDiagnostic)> {
		self.project
			.diagnostics
			.iter()
			.map(|diagnostic| (diagnostic.severity(&self.validation), diagnostic))
			.filter(|(severity, _)| *severity != Severity::Ignored)
			.collect()
	}

	pub fn error_count(&self) -> usize {
		self.project
			.diagnostics
			.iter()
			.filter(|diagnostic| diagnostic.is_error(&self.validation))
			.count()
	}

	pub fn has_errors(&self) -> bool {
		self.error_count() > 0
	}
}

/// Scan a project with config: loads the discovered config (or the
/// defaults), then scans its content directory.
pub fn scan_project_with_config(root: &Path) -> ContentResult<ProjectContext> {
	let config_path = ContentConfig::resolve_path(root);
	let config = ContentConfig::load_or_default(root)?;
	let options = ScanOptions::from_config(&config);

	scan_project_with_options(root, config, config_path, &options)
}

/// Scan the content directory of `root` using an explicit config.
pub fn scan_project_with_options(
	root: &Path,
	config: ContentConfig,
	config_path: Option<PathBuf>,
	options: &ScanOptions,
) -> ContentResult<ProjectContext> {
	let document_types = DocumentTypes::compile(&config.document_types)?;
	let pipeline = Pipeline::from_config(&config.markdown);
	let content_root = config.content_root(root);

	if !content_root.is_dir() {
		return Err(ContentError::MissingContentDir(
			config.content_dir.display().to_string(),
		));
	}

	let files = collect_files(
		root,
		&content_root,
		&options.exclude_patterns,
		options.disable_gitignore,
	)?;
	let project_key = build_project_cache_key(&config, options);
	let file_fingerprints = collect_file_fingerprints(
		&content_root,
		&files,
		options.max_file_size,
		options.cache_verify_hash,
	)?;

	let mut cache = if options.use_cache {
		index_cache::load(root, &project_key)
	} else {
		None
	};

	if let Some(cached) = &mut cache {
		if cached.files == file_fingerprints {
			tracing::debug!(files = files.len(), "reusing cached project");
			cached
				.telemetry
				.record_scan(true, files.len(), 0);
			index_cache::save(root, cached);
			let stats = ScanStats {
				full_project_hit: true,
				reused_files: files.len(),
				reprocessed_files: 0,
				total_files: files.len(),
			};

			return Ok(ProjectContext {
				root: root.to_path_buf(),
				validation: ValidationOptions::from(&config.validation),
				project: cached.project.clone(),
				config,
				config_path,
				stats,
			});
		}
	}

	let mut merged = BTreeMap::new();
	let mut reused_files = 0usize;
	let mut reprocessed_files = 0usize;
	for file in &files {
		let file_key = index_cache::relative_file_key(&content_root, file);
		let fingerprint = file_fingerprints.get(&file_key);
		let cached_entry = cache.as_ref().and_then(|cached| {
			if cached.files.get(&file_key) == fingerprint {
				return cached.file_data.get(&file_key).cloned();
			}

			None
		});

		let entry = if let Some(entry) = cached_entry {
			reused_files = reused_files.saturating_add(1);
			entry
		} else {
			reprocessed_files = reprocessed_files.saturating_add(1);
			process_file(file, &file_key, &document_types, &pipeline)?
		};

		merged.insert(file_key, entry);
	}

	let project = build_project_from_file_data(&merged);
	tracing::info!(
		documents = project.documents.len(),
		diagnostics = project.diagnostics.len(),
		reused = reused_files,
		reprocessed = reprocessed_files,
		"scanned content"
	);

	if options.use_cache {
		let mut next_cache =
			ProjectIndexCache::new(project_key, file_fingerprints, merged, project.clone());
		if let Some(previous_cache) = cache {
			next_cache.telemetry = previous_cache.telemetry;
		}
		next_cache
			.telemetry
			.record_scan(false, reused_files, reprocessed_files);
		index_cache::save(root, &next_cache);
	}

	Ok(ProjectContext {
		root: root.to_path_buf(),
		validation: ValidationOptions::from(&config.validation),
		project,
		config,
		config_path,
		stats: ScanStats {
			full_project_hit: false,
			reused_files,
			reprocessed_files,
			total_files: files.len(),
		},
	})
}

/// Match one file to a document type and ingest it.
fn process_file(
	file: &Path,
	relative_path: &str,
	document_types: &DocumentTypes,
	pipeline: &Pipeline,
) -> ContentResult<IngestOutcome> {
	let matching = document_types.matching(Path::new(relative_path));
	let Some((document_type, others)) = matching.split_first() else {
		let mut outcome = IngestOutcome::default();
		if is_markdown_file(file) {
			outcome.diagnostics.push(ProjectDiagnostic {
				file: PathBuf::from(relative_path),
				kind: DiagnosticKind::UnmatchedFile,
			});
		} else {
			tracing::debug!(file = relative_path, "skipping file without a document type");
		}
		return Ok(outcome);
	};

	tracing::debug!(file = relative_path, document_type = document_type.name(), "ingesting");
	let raw_content = std::fs::read_to_string(file)?;
	let content = normalize_line_endings(&raw_content);
	let mut outcome = ingest_document(relative_path, &content, document_type, pipeline);

	if !others.is_empty() {
		outcome.diagnostics.insert(0, ProjectDiagnostic {
			file: PathBuf::from(relative_path),
			kind: DiagnosticKind::AmbiguousDocumentType {
				chosen: document_type.name().to_string(),
				others: others.iter().map(|other| other.name().to_string()).collect(),
			},
		});
	}

	Ok(outcome)
}

fn build_project_from_file_data(file_data: &BTreeMap<String, IngestOutcome>) -> ContentProject {
	let mut documents = Vec::new();
	let mut diagnostics = Vec::new();

	for entry in file_data.values() {
		diagnostics.extend(entry.diagnostics.iter().cloned());
		if let Some(document) = &entry.document {
			documents.push(document.clone());
		}
	}

	documents.sort_by(|a, b| a.id.cmp(&b.id));

	ContentProject {
		documents,
		diagnostics,
	}
}

/// Normalize CRLF line endings to LF.
pub fn normalize_line_endings(content: &str) -> String {
	if content.contains('\r') {
		content.replace("\r\n", "\n").replace('\r', "\n")
	} else {
		content.to_string()
	}
}

fn build_project_cache_key(config: &ContentConfig, options: &ScanOptions) -> String {
	format!(
		"index-v1|config={}|cache_verify_hash={}",
		config.fingerprint(),
		options.cache_verify_hash,
	)
}

/// Return the absolute path to the project's cache artifact.
pub fn project_cache_path(root: &Path) -> PathBuf {
	index_cache::cache_path(root)
}

/// Read-only view of the on-disk index cache.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCacheInspection {
	pub path: PathBuf,
	pub exists: bool,
	/// Whether the artifact parsed and matches the current schema version.
	pub valid: bool,
	/// Whether the artifact was written for the current configuration.
	pub project_key_matches: bool,
	pub hash_verification_enabled: bool,
	pub scan_count: Option<u64>,
}

/// Inspect the project's cache artifact without mutating it.
pub fn inspect_project_cache(
	root: &Path,
	config: &ContentConfig,
	options: &ScanOptions,
) -> ProjectCacheInspection {
	let path = project_cache_path(root);
	let mut inspection = ProjectCacheInspection {
		path: path.clone(),
		exists: path.is_file(),
		valid: false,
		project_key_matches: false,
		hash_verification_enabled: options.cache_verify_hash,
		scan_count: None,
	};

	let Some(cache) = index_cache::read(root) else {
		return inspection;
	};

	inspection.valid = cache.schema_version == index_cache::CACHE_SCHEMA_VERSION;
	inspection.project_key_matches = cache.project_key == build_project_cache_key(config, options);
	inspection.scan_count = Some(cache.telemetry.scan_count);
	inspection
}

fn collect_file_fingerprints(
	content_root: &Path,
	files: &[PathBuf],
	max_file_size: u64,
	verify_hash: bool,
) -> ContentResult<BTreeMap<String, FileFingerprint>> {
	let mut fingerprints = BTreeMap::new();

	for file in files {
		let metadata = std::fs::metadata(file)?;
		if metadata.len() > max_file_size {
			return Err(ContentError::FileTooLarge {
				path: file.display().to_string(),
				size: metadata.len(),
				limit: max_file_size,
			});
		}

		let content_hash = if verify_hash {
			Some(hash_file_contents(file)?)
		} else {
			None
		};

		fingerprints.insert(
			index_cache::relative_file_key(content_root, file),
			index_cache::build_file_fingerprint(&metadata, content_hash),
		);
	}

	Ok(fingerprints)
}

fn hash_file_contents(path: &Path) -> ContentResult<u64> {
	let bytes = std::fs::read(path)?;
	let mut hasher = DefaultHasher::new();
	bytes.hash(&mut hasher);
	Ok(hasher.finish())
}

/// Build a `Gitignore` matcher from `[exclude]` patterns. These follow
/// `.gitignore` syntax relative to the project root and are applied on top
/// of any `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> ContentResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			ContentError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| ContentError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Collect every content file below `content_root`.
///
/// When `disable_gitignore` is false (the default), files matched by the
/// project's `.gitignore` are skipped. Exclude patterns always apply.
fn collect_files(
	root: &Path,
	content_root: &Path,
	exclude_patterns: &[String],
	disable_gitignore: bool,
) -> ContentResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();

	let gitignore = if disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, exclude_patterns)?;

	walk_dir(
		content_root,
		&mut files,
		&gitignore,
		&custom_exclude,
		&mut visited_dirs,
	)?;
	files.sort();
	Ok(files)
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	gitignore: &Gitignore,
	custom_exclude: &Gitignore,
	visited_dirs: &mut HashSet<PathBuf>,
) -> ContentResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	// Detect symlink cycles by tracking canonical paths.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(ContentError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
			if is_ignored_name(name) {
				continue;
			}
		}

		let is_dir = path.is_dir();
		if gitignore.matched(&path, is_dir).is_ignore()
			|| custom_exclude.matched(&path, is_dir).is_ignore()
		{
			continue;
		}

		if is_dir {
			walk_dir(&path, files, gitignore, custom_exclude, visited_dirs)?;
		} else if is_content_file(&path) {
			files.push(path);
		}
	}

	Ok(())
}

pub(crate) fn is_ignored_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

/// Files that can become documents: markdown, MDX, and data files.
fn is_content_file(path: &Path) -> bool {
	is_markdown_file(path) || crate::data::data_format_for(path).is_some()
}

fn is_markdown_file(path: &Path) -> bool {
	let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
		return false;
	};

	matches!(ext, "md" | "mdx" | "markdown")
}
