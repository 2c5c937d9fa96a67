use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ContentError {
	#[error(transparent)]
	#[diagnostic(code(contentkit::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse `{path}` as markdown: {reason}")]
	#[diagnostic(code(contentkit::markdown))]
	Markdown { path: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(contentkit::config_parse),
		help("check that contentkit.toml is valid TOML with `[[document_types]]` entries")
	)]
	ConfigParse(String),

	#[error("invalid document type `{name}`: {reason}")]
	#[diagnostic(code(contentkit::invalid_document_type))]
	InvalidDocumentType { name: String, reason: String },

	#[error("duplicate document type `{0}`")]
	#[diagnostic(
		code(contentkit::duplicate_document_type),
		help("each `[[document_types]]` entry needs a unique `name`")
	)]
	DuplicateDocumentType(String),

	#[error("invalid file path pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(contentkit::invalid_pattern),
		help("patterns are globs relative to the content directory, e.g. `posts/**/*.mdx`")
	)]
	InvalidPattern { pattern: String, reason: String },

	#[error("invalid output directory `{path}`: {reason}")]
	#[diagnostic(
		code(contentkit::invalid_output_dir),
		help("set `output_dir` to a dedicated directory such as `.contentkit/generated`")
	)]
	InvalidOutputDir { path: String, reason: String },

	#[error("documents `{first}` and `{second}` both generate `{file}`")]
	#[diagnostic(
		code(contentkit::output_collision),
		help("rename one of the source files so their ids map to different records")
	)]
	OutputCollision {
		file: String,
		first: String,
		second: String,
	},

	#[error("content directory not found: `{0}`")]
	#[diagnostic(
		code(contentkit::missing_content_dir),
		help("create the directory or set `content_dir` in contentkit.toml")
	)]
	MissingContentDir(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(contentkit::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(contentkit::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("unconvertible float value in `{path}`: {value}")]
	#[diagnostic(
		code(contentkit::unconvertible_float),
		help("NaN and Infinity are not valid JSON numbers")
	)]
	UnconvertibleFloat { path: String, value: String },

	#[error("{count} document(s) failed validation")]
	#[diagnostic(
		code(contentkit::invalid_documents),
		help(
			"fix the reported fields or set `on_missing_or_incompatible_data = \"skip-warn\"` \
			 under `[validation]`"
		)
	)]
	InvalidDocuments { count: usize },

	#[error("failed to serialize generated output for `{id}`: {reason}")]
	#[diagnostic(code(contentkit::serialize))]
	Serialize { id: String, reason: String },

	#[error("file too large: `{path}` is {size} bytes (limit: {limit} bytes)")]
	#[diagnostic(
		code(contentkit::file_too_large),
		help("increase `max_file_size` in contentkit.toml or exclude this file")
	)]
	FileTooLarge { path: String, size: u64, limit: u64 },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(contentkit::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

pub type ContentResult<T> = Result<T, ContentError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
