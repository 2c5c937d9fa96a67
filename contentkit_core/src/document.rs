use std::path::Path;

use markdown::mdast::Node;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::ComputedField;
use crate::DiagnosticKind;
use crate::ProjectDiagnostic;
use crate::data::data_format_for;
use crate::data::parse_data;
use crate::flattened_path;
use crate::pipeline::Pipeline;
use crate::schema::ContentType;
use crate::schema::DocumentType;
use crate::schema::FieldIssue;

/// Where a document came from, emitted as `_raw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocumentData {
	/// Path relative to the content directory, `/`-separated.
	pub source_file_path: String,
	pub source_file_name: String,
	/// Directory of the source file relative to the content directory, or
	/// `""` at the root.
	pub source_file_dir: String,
	pub content_type: ContentType,
	/// The path fed to the computed field resolvers.
	pub flattened_path: String,
}

impl RawDocumentData {
	pub fn new(source_file_path: &str, content_type: ContentType) -> Self {
		let source_file_path = source_file_path.replace('\\', "/");
		let (source_file_dir, source_file_name) = match source_file_path.rsplit_once('/') {
			Some((dir, name)) => (dir.to_string(), name.to_string()),
			None => (String::new(), source_file_path.clone()),
		};

		Self {
			flattened_path: flattened_path(&source_file_path),
			source_file_path,
			source_file_name,
			source_file_dir,
			content_type,
		}
	}
}

/// The body of a markdown or MDX document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
	/// Source text after the frontmatter.
	pub raw: String,
	/// Rendered HTML.
	pub html: String,
}

/// One generated document record.
///
/// Declared fields and computed fields share the top level of the record
/// with `_id`, `_raw`, `type`, and `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "_raw")]
	pub raw: RawDocumentData,
	#[serde(rename = "type")]
	pub document_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Body>,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Document {
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	/// The computed `path`, when the document type enables it.
	pub fn path(&self) -> Option<&str> {
		self.fields
			.get(ComputedField::Path.name())
			.and_then(Value::as_str)
	}

	/// The computed `slug`, when the document type enables it.
	pub fn slug(&self) -> Option<&str> {
		self.fields
			.get(ComputedField::Slug.name())
			.and_then(Value::as_str)
	}

	pub fn title(&self) -> Option<&str> {
		self.fields.get("title").and_then(Value::as_str)
	}
}

/// The result of ingesting one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
	/// `None` when the file is invalid and was dropped.
	pub document: Option<Document>,
	pub diagnostics: Vec<ProjectDiagnostic>,
}

/// Frontmatter fields and body of a parsed markdown or MDX source.
struct ParsedSource {
	fields: Map<String, Value>,
	raw_body: String,
	mdast: Node,
}

/// Turn a source file into a document of `document_type`.
///
/// Problems with the content itself become diagnostics; a document with a
/// missing or incompatible field is dropped.
pub fn ingest_document(
	relative_path: &str,
	source: &str,
	document_type: &DocumentType,
	pipeline: &Pipeline,
) -> IngestOutcome {
	let file = Path::new(relative_path).to_path_buf();
	let content_type = document_type.content_type();
	let raw = RawDocumentData::new(relative_path, content_type);
	let mut outcome = IngestOutcome::default();
	let invalid = |reason: String| ProjectDiagnostic {
		file: file.clone(),
		kind: DiagnosticKind::InvalidContent { reason },
	};

	let (authored, body) = match content_type {
		ContentType::Data => {
			let Some(format) = data_format_for(Path::new(relative_path)) else {
				outcome.diagnostics.push(invalid(
					"data documents must be json, yaml, or toml files".to_string(),
				));
				return outcome;
			};
			match parse_data(source, &format, relative_path) {
				Ok(Value::Object(fields)) => (fields, None),
				Ok(other) => {
					outcome.diagnostics.push(invalid(format!(
						"expected a top-level mapping, found {}",
						crate::schema::value_kind(&other)
					)));
					return outcome;
				}
				Err(error) => {
					outcome.diagnostics.push(invalid(error.to_string()));
					return outcome;
				}
			}
		}
		ContentType::Mdx | ContentType::Markdown => {
			let parsed = match parse_source(source, content_type, relative_path, pipeline) {
				Ok(parsed) => parsed,
				Err(reason) => {
					outcome.diagnostics.push(invalid(reason));
					return outcome;
				}
			};
			let html = pipeline.render(&parsed.mdast, content_type);
			(
				parsed.fields,
				Some(Body {
					raw: parsed.raw_body,
					html,
				}),
			)
		}
	};

	let validation = document_type.validate_fields(&authored);
	let mut invalidated = false;
	for issue in validation.issues {
		invalidated |= issue.is_invalidating();
		let kind = match issue {
			FieldIssue::Missing { field } => DiagnosticKind::MissingRequiredField {
				document_type: document_type.name().to_string(),
				field,
			},
			FieldIssue::Incompatible {
				field,
				expected,
				found,
			} => DiagnosticKind::IncompatibleField {
				document_type: document_type.name().to_string(),
				field,
				expected,
				found,
			},
			FieldIssue::Extra { field } => DiagnosticKind::ExtraField {
				document_type: document_type.name().to_string(),
				field,
			},
		};
		outcome.diagnostics.push(ProjectDiagnostic {
			file: file.clone(),
			kind,
		});
	}

	if invalidated {
		tracing::debug!(file = relative_path, "dropping invalid document");
		return outcome;
	}

	let mut fields = validation.fields;
	for computed in &document_type.config.computed_fields {
		let value = computed.resolve(&raw.flattened_path);
		if *computed == ComputedField::Slug && value.is_empty() {
			outcome.diagnostics.push(ProjectDiagnostic {
				file: file.clone(),
				kind: DiagnosticKind::EmptySlug {
					document_type: document_type.name().to_string(),
					flattened_path: raw.flattened_path.clone(),
				},
			});
		}
		fields.insert(computed.name().to_string(), Value::String(value));
	}

	outcome.document = Some(Document {
		id: raw.source_file_path.clone(),
		raw,
		document_type: document_type.name().to_string(),
		body,
		fields,
	});

	outcome
}

fn parse_source(
	source: &str,
	content_type: ContentType,
	relative_path: &str,
	pipeline: &Pipeline,
) -> Result<ParsedSource, String> {
	let mdast = pipeline
		.parse(source, content_type, relative_path)
		.map_err(|error| error.to_string())?;

	let frontmatter = mdast.children().and_then(|children| children.first());
	let (fields, body_start) = match frontmatter {
		Some(Node::Yaml(yaml)) => (
			frontmatter_fields(&yaml.value, "yaml", relative_path)?,
			yaml.position.as_ref().map(|position| position.end.offset),
		),
		Some(Node::Toml(toml)) => (
			frontmatter_fields(&toml.value, "toml", relative_path)?,
			toml.position.as_ref().map(|position| position.end.offset),
		),
		_ => (Map::new(), None),
	};

	let raw_body = body_start
		.and_then(|offset| source.get(offset..))
		.unwrap_or(source)
		.trim_start_matches(['\r', '\n'])
		.to_string();

	Ok(ParsedSource {
		fields,
		raw_body,
		mdast,
	})
}

fn frontmatter_fields(
	value: &str,
	format: &str,
	relative_path: &str,
) -> Result<Map<String, Value>, String> {
	match parse_data(value, format, relative_path) {
		Ok(Value::Object(fields)) => Ok(fields),
		Ok(Value::Null) => Ok(Map::new()),
		Ok(other) => {
			Err(format!(
				"frontmatter must be a mapping, found {}",
				crate::schema::value_kind(&other)
			))
		}
		Err(error) => Err(error.to_string()),
	}
}
