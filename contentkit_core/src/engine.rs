use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::ContentError;
use crate::ContentResult;
use crate::document::Document;
use crate::project::ProjectContext;

/// Name of the global index written at the root of the output directory.
pub const INDEX_FILE_NAME: &str = "index.json";
/// Name of the per-type collection file.
pub const TYPE_INDEX_FILE_NAME: &str = "_index.json";

/// The complete set of files the output directory should contain.
#[derive(Debug, Clone, Default)]
pub struct GeneratedOutputs {
	pub output_root: PathBuf,
	/// One directory per configured document type. Only JSON files directly
	/// inside these are ever treated as orphans.
	pub type_dirs: Vec<PathBuf>,
	/// Absolute file path to file content.
	pub files: BTreeMap<PathBuf, String>,
	pub document_count: usize,
}

/// Why an output file is out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleKind {
	/// The file should exist but doesn't.
	Missing,
	/// The file exists with different content.
	Changed,
	/// The file exists but no document produces it.
	Orphaned,
}

/// An output file that doesn't match the content it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
	pub file: PathBuf,
	pub kind: StaleKind,
	/// Content currently on disk.
	pub current_content: Option<String>,
	/// Content a build would write.
	pub expected_content: Option<String>,
}

/// Result of checking the output directory against the content.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
	pub stale: Vec<StaleEntry>,
	/// Number of diagnostics that are errors under the current validation
	/// options.
	pub error_count: usize,
}

impl CheckResult {
	/// Returns true if every output is current and no document is invalid.
	pub fn is_ok(&self) -> bool {
		self.stale.is_empty() && self.error_count == 0
	}
}

/// Result of writing outputs to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
	pub written: Vec<PathBuf>,
	pub unchanged: usize,
	pub removed: Vec<PathBuf>,
}

/// Fail when any diagnostic is an error under the project's validation
/// options.
pub fn ensure_valid(ctx: &ProjectContext) -> ContentResult<()> {
	let count = ctx.error_count();
	if count > 0 {
		return Err(ContentError::InvalidDocuments { count });
	}

	Ok(())
}

/// Naive English plural used for collection keys: `Page` → `Pages`,
/// `Story` → `Stories`, `Box` → `Boxes`.
pub fn pluralize(name: &str) -> String {
	let lower = name.to_ascii_lowercase();
	let ends_with_consonant_y = lower.ends_with('y')
		&& !lower
			.chars()
			.rev()
			.nth(1)
			.is_some_and(|ch| matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u'));

	if ends_with_consonant_y && name.len() > 1 {
		format!("{}ies", &name[..name.len() - 1])
	} else if ["s", "x", "z", "ch", "sh"]
		.iter()
		.any(|suffix| lower.ends_with(suffix))
	{
		format!("{name}es")
	} else {
		format!("{name}s")
	}
}

/// The key a document type's id list is stored under in `index.json`.
pub fn collection_key(document_type: &str) -> String {
	format!("all{}", pluralize(document_type))
}

/// File name of one document record: `/` in the id becomes `__`.
pub fn document_file_name(id: &str) -> String {
	format!("{}.json", id.replace('/', "__"))
}

fn to_json<T: Serialize + ?Sized>(value: &T, id: &str) -> ContentResult<String> {
	serde_json::to_string_pretty(value)
		.map(|mut json| {
			json.push('\n');
			json
		})
		.map_err(|e| {
			ContentError::Serialize {
				id: id.to_string(),
				reason: e.to_string(),
			}
		})
}

/// Compute every file the output directory should contain.
pub fn compute_outputs(ctx: &ProjectContext) -> ContentResult<GeneratedOutputs> {
	let output_root = ctx.output_root();
	let mut files = BTreeMap::new();
	let mut type_dirs = Vec::new();
	let mut index = Map::new();
	let mut type_names = Vec::new();

	for document_type in &ctx.config.document_types {
		let name = document_type.name.as_str();
		let type_dir = output_root.join(name);
		let documents: Vec<&Document> = ctx.project.documents_of_type(name).collect();

		let mut owners: BTreeMap<String, &str> = BTreeMap::new();
		for document in &documents {
			let file_name = document_file_name(&document.id);
			if let Some(first) = owners.insert(file_name.clone(), &document.id) {
				return Err(ContentError::OutputCollision {
					file: format!("{name}/{file_name}"),
					first: first.to_string(),
					second: document.id.clone(),
				});
			}

			files.insert(type_dir.join(file_name), to_json(document, &document.id)?);
		}

		files.insert(
			type_dir.join(TYPE_INDEX_FILE_NAME),
			to_json(&documents, name)?,
		);

		let ids: Vec<Value> = documents
			.iter()
			.map(|document| Value::String(document.id.clone()))
			.collect();
		index.insert(collection_key(name), Value::Array(ids));
		type_names.push(Value::String(name.to_string()));
		type_dirs.push(type_dir);
	}

	index.insert("documentTypes".to_string(), Value::Array(type_names));
	index.insert(
		"allDocuments".to_string(),
		Value::Array(
			ctx.project
				.documents
				.iter()
				.map(|document| Value::String(document.id.clone()))
				.collect(),
		),
	);
	files.insert(
		output_root.join(INDEX_FILE_NAME),
		to_json(&Value::Object(index), INDEX_FILE_NAME)?,
	);

	Ok(GeneratedOutputs {
		output_root,
		type_dirs,
		files,
		document_count: ctx.project.documents.len(),
	})
}

/// Compare computed outputs with the files on disk.
pub fn check_outputs(ctx: &ProjectContext, outputs: &GeneratedOutputs) -> ContentResult<CheckResult> {
	let mut stale = Vec::new();

	for (file, expected) in &outputs.files {
		match std::fs::read_to_string(file) {
			Ok(current) if current == *expected => {}
			Ok(current) => {
				stale.push(StaleEntry {
					file: file.clone(),
					kind: StaleKind::Changed,
					current_content: Some(current),
					expected_content: Some(expected.clone()),
				});
			}
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				stale.push(StaleEntry {
					file: file.clone(),
					kind: StaleKind::Missing,
					current_content: None,
					expected_content: Some(expected.clone()),
				});
			}
			Err(error) => return Err(error.into()),
		}
	}

	for file in find_orphaned_outputs(outputs)? {
		let current_content = std::fs::read_to_string(&file).ok();
		stale.push(StaleEntry {
			file,
			kind: StaleKind::Orphaned,
			current_content,
			expected_content: None,
		});
	}

	Ok(CheckResult {
		stale,
		error_count: ctx.error_count(),
	})
}

/// Write changed outputs and remove orphaned ones.
pub fn write_outputs(outputs: &GeneratedOutputs) -> ContentResult<WriteResult> {
	let mut result = WriteResult::default();

	for (file, content) in &outputs.files {
		if std::fs::read_to_string(file).is_ok_and(|current| current == *content) {
			result.unchanged += 1;
			continue;
		}

		write_atomic(file, content)?;
		tracing::debug!(file = %file.display(), "wrote output");
		result.written.push(file.clone());
	}

	for file in find_orphaned_outputs(outputs)? {
		std::fs::remove_file(&file)?;
		tracing::debug!(file = %file.display(), "removed orphaned output");
		result.removed.push(file);
	}

	Ok(result)
}

fn write_atomic(path: &Path, content: &str) -> ContentResult<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}

	let temp_path = path.with_extension(format!(
		"json.tmp-{}-{}",
		std::process::id(),
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |duration| duration.as_nanos())
	));
	std::fs::write(&temp_path, content)?;

	if let Err(error) = std::fs::rename(&temp_path, path) {
		let _ = std::fs::remove_file(&temp_path);
		return Err(error.into());
	}

	Ok(())
}

/// JSON records in the document type directories that no document
/// produces. Nothing outside those directories is ever considered.
fn find_orphaned_outputs(outputs: &GeneratedOutputs) -> ContentResult<Vec<PathBuf>> {
	let mut orphaned = Vec::new();
	for dir in &outputs.type_dirs {
		collect_json_files(dir, &mut orphaned)?;
	}
	orphaned.retain(|file| !outputs.files.contains_key(file));
	orphaned.sort();
	Ok(orphaned)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> ContentResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
			files.push(path);
		}
	}

	Ok(())
}
