use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::document::IngestOutcome;
use crate::project::ContentProject;

pub(crate) const CACHE_SCHEMA_VERSION: u32 = 1;
const CACHE_FILE_NAME: &str = "index-v1.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct FileFingerprint {
	pub size: u64,
	pub modified_unix_ms: u64,
	pub content_hash: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub(crate) struct CacheTelemetry {
	pub scan_count: u64,
	pub full_project_hit_count: u64,
	pub reused_file_count_total: u64,
	pub reprocessed_file_count_total: u64,
	pub last_scan_unix_ms: Option<u64>,
}

impl CacheTelemetry {
	pub(crate) fn record_scan(
		&mut self,
		full_project_hit: bool,
		reused_files: usize,
		reprocessed_files: usize,
	) {
		let reused_files = u64::try_from(reused_files).unwrap_or(u64::MAX);
		let reprocessed_files = u64::try_from(reprocessed_files).unwrap_or(u64::MAX);

		self.scan_count = self.scan_count.saturating_add(1);
		if full_project_hit {
			self.full_project_hit_count = self.full_project_hit_count.saturating_add(1);
		}
		self.reused_file_count_total = self.reused_file_count_total.saturating_add(reused_files);
		self.reprocessed_file_count_total = self
			.reprocessed_file_count_total
			.saturating_add(reprocessed_files);
		self.last_scan_unix_ms = Some(now_unix_ms());
	}
}

/// Per-file ingestion results from a previous scan, keyed by the path
/// relative to the content directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProjectIndexCache {
	pub schema_version: u32,
	pub project_key: String,
	pub files: BTreeMap<String, FileFingerprint>,
	pub file_data: BTreeMap<String, IngestOutcome>,
	#[serde(default)]
	pub telemetry: CacheTelemetry,
	pub project: ContentProject,
}

impl ProjectIndexCache {
	pub(crate) fn new(
		project_key: String,
		files: BTreeMap<String, FileFingerprint>,
		file_data: BTreeMap<String, IngestOutcome>,
		project: ContentProject,
	) -> Self {
		Self {
			schema_version: CACHE_SCHEMA_VERSION,
			project_key,
			files,
			file_data,
			telemetry: CacheTelemetry::default(),
			project,
		}
	}
}

fn now_unix_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |duration| {
			duration.as_millis().try_into().unwrap_or(u64::MAX)
		})
}

pub(crate) fn cache_path(root: &Path) -> PathBuf {
	root.join(".contentkit").join("cache").join(CACHE_FILE_NAME)
}

pub(crate) fn relative_file_key(root: &Path, file: &Path) -> String {
	file.strip_prefix(root)
		.unwrap_or(file)
		.to_string_lossy()
		.replace('\\', "/")
}

pub(crate) fn build_file_fingerprint(
	metadata: &Metadata,
	content_hash: Option<u64>,
) -> FileFingerprint {
	let modified_unix_ms = metadata
		.modified()
		.ok()
		.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
		.and_then(|duration| duration.as_millis().try_into().ok())
		.unwrap_or(0);

	FileFingerprint {
		size: metadata.len(),
		modified_unix_ms,
		content_hash,
	}
}

/// Read the cache artifact regardless of its key.
pub(crate) fn read(root: &Path) -> Option<ProjectIndexCache> {
	let bytes = std::fs::read(cache_path(root)).ok()?;
	match serde_json::from_slice(&bytes) {
		Ok(cache) => Some(cache),
		Err(error) => {
			tracing::warn!(%error, "ignoring unreadable index cache");
			None
		}
	}
}

/// Load the cache when it was written by this schema version for the same
/// project key.
pub(crate) fn load(root: &Path, project_key: &str) -> Option<ProjectIndexCache> {
	let cache = read(root)?;

	if cache.schema_version != CACHE_SCHEMA_VERSION {
		return None;
	}

	if cache.project_key != project_key {
		tracing::debug!("index cache was written for a different configuration");
		return None;
	}

	Some(cache)
}

pub(crate) fn save(root: &Path, cache: &ProjectIndexCache) {
	let cache_path = cache_path(root);
	let Some(cache_dir) = cache_path.parent() else {
		return;
	};

	if std::fs::create_dir_all(cache_dir).is_err() {
		return;
	}

	let Ok(payload) = serde_json::to_vec(cache) else {
		return;
	};

	let temp_path = cache_path.with_extension(format!(
		"json.tmp-{}-{}",
		std::process::id(),
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |duration| duration.as_nanos())
	));

	if std::fs::write(&temp_path, payload).is_err() {
		return;
	}

	if std::fs::rename(&temp_path, &cache_path).is_err() {
		let _ = std::fs::remove_file(temp_path);
	}
}
