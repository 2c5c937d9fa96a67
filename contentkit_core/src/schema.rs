use std::collections::BTreeMap;
use std::path::Path;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use derive_more::Deref;
use globset::GlobBuilder;
use globset::GlobMatcher;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::ComputedField;
use crate::ContentError;
use crate::ContentResult;

/// Keys every document record carries that a schema may not redeclare.
pub const RESERVED_FIELD_NAMES: [&str; 4] = ["_id", "_raw", "type", "body"];

/// How a document's source file is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	/// MDX: markdown with ESM, expressions and JSX.
	#[default]
	Mdx,
	/// CommonMark with raw HTML passed through.
	Markdown,
	/// A whole-file JSON, YAML, or TOML record without a body.
	Data,
}

impl ContentType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Mdx => "mdx",
			Self::Markdown => "markdown",
			Self::Data => "data",
		}
	}
}

impl std::fmt::Display for ContentType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Item type of a `list` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
	String,
	Number,
	Boolean,
	Date,
	Json,
}

/// The declared type of a frontmatter field.
///
/// ```toml
/// [document_types.fields.tags]
/// type = "list"
/// of = "string"
///
/// [document_types.fields.status]
/// type = "enum"
/// options = ["draft", "live"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum FieldType {
	String,
	Number,
	Boolean,
	Date,
	Json,
	List { of: ScalarType },
	Enum { options: Vec<String> },
}

impl FieldType {
	/// Short human-readable description used in diagnostics.
	pub fn describe(&self) -> String {
		match self {
			Self::String => "string".to_string(),
			Self::Number => "number".to_string(),
			Self::Boolean => "boolean".to_string(),
			Self::Date => "date".to_string(),
			Self::Json => "json".to_string(),
			Self::List { of } => format!("list of {}", scalar_name(*of)),
			Self::Enum { options } => format!("one of [{}]", options.join(", ")),
		}
	}

	/// Check `value` against this type and return its normalized form.
	pub fn coerce(&self, value: &Value) -> Option<Value> {
		match self {
			Self::String => value.is_string().then(|| value.clone()),
			Self::Number => value.is_number().then(|| value.clone()),
			Self::Boolean => value.is_boolean().then(|| value.clone()),
			Self::Date => value.as_str().and_then(normalize_date).map(Value::String),
			Self::Json => Some(value.clone()),
			Self::List { of } => {
				let items = value.as_array()?;
				let item_type = scalar_field_type(*of);
				items
					.iter()
					.map(|item| item_type.coerce(item))
					.collect::<Option<Vec<_>>>()
					.map(Value::Array)
			}
			Self::Enum { options } => {
				let text = value.as_str()?;
				options
					.iter()
					.any(|option| option == text)
					.then(|| value.clone())
			}
		}
	}
}

fn scalar_name(scalar: ScalarType) -> &'static str {
	match scalar {
		ScalarType::String => "string",
		ScalarType::Number => "number",
		ScalarType::Boolean => "boolean",
		ScalarType::Date => "date",
		ScalarType::Json => "json",
	}
}

fn scalar_field_type(scalar: ScalarType) -> FieldType {
	match scalar {
		ScalarType::String => FieldType::String,
		ScalarType::Number => FieldType::Number,
		ScalarType::Boolean => FieldType::Boolean,
		ScalarType::Date => FieldType::Date,
		ScalarType::Json => FieldType::Json,
	}
}

/// Parse a date written as `YYYY-MM-DD`, a naive date-time, or RFC 3339 and
/// render it as an RFC 3339 UTC timestamp with millisecond precision.
pub fn normalize_date(raw: &str) -> Option<String> {
	let raw = raw.trim();
	let parsed: DateTime<Utc> = if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
		date_time.with_timezone(&Utc)
	} else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
		naive.and_utc()
	} else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
		naive.and_utc()
	} else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
		date.and_hms_opt(0, 0, 0)?.and_utc()
	} else {
		return None;
	};

	Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Describe the JSON type of a value for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// A single declared field of a document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
	#[serde(flatten)]
	pub field_type: FieldType,
	/// Documents without this field are rejected.
	#[serde(default)]
	pub required: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Value used when the field is absent. Must match the field type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default: Option<Value>,
}

impl FieldDef {
	pub fn new(field_type: FieldType) -> Self {
		Self {
			field_type,
			required: false,
			description: None,
			default: None,
		}
	}

	#[must_use]
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	#[must_use]
	pub fn describe(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}
}

fn default_computed_fields() -> Vec<ComputedField> {
	ComputedField::ALL.to_vec()
}

/// A `[[document_types]]` entry as written in `contentkit.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeConfig {
	/// The name emitted as each record's `type`.
	pub name: String,
	/// Glob relative to the content directory, e.g. `posts/**/*.mdx`.
	pub file_path_pattern: String,
	#[serde(default)]
	pub content_type: ContentType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default)]
	pub fields: BTreeMap<String, FieldDef>,
	#[serde(default = "default_computed_fields")]
	pub computed_fields: Vec<ComputedField>,
}

/// A problem with one field of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FieldIssue {
	/// A required field is absent.
	Missing { field: String },
	/// A field is present but does not match its declared type.
	Incompatible {
		field: String,
		expected: String,
		found: String,
	},
	/// A field is present in the source but not declared by the schema.
	Extra { field: String },
}

impl FieldIssue {
	/// True for issues that make the document invalid.
	pub fn is_invalidating(&self) -> bool {
		!matches!(self, Self::Extra { .. })
	}
}

/// Result of checking authored fields against a schema.
#[derive(Debug, Clone, Default)]
pub struct FieldValidation {
	/// The declared fields in normalized form.
	pub fields: Map<String, Value>,
	pub issues: Vec<FieldIssue>,
}

/// A document type with its file pattern compiled.
#[derive(Debug, Clone)]
pub struct DocumentType {
	pub config: DocumentTypeConfig,
	matcher: GlobMatcher,
}

impl DocumentType {
	/// Compile a document type, checking its pattern and field names.
	pub fn compile(config: DocumentTypeConfig) -> ContentResult<Self> {
		if config.name.trim().is_empty() {
			return Err(ContentError::InvalidDocumentType {
				name: config.name,
				reason: "name must not be empty".to_string(),
			});
		}

		for (field_name, def) in &config.fields {
			if RESERVED_FIELD_NAMES.contains(&field_name.as_str()) {
				return Err(ContentError::InvalidDocumentType {
					name: config.name.clone(),
					reason: format!("field `{field_name}` is reserved"),
				});
			}

			if config
				.computed_fields
				.iter()
				.any(|computed| computed.name() == field_name)
			{
				return Err(ContentError::InvalidDocumentType {
					name: config.name.clone(),
					reason: format!("field `{field_name}` collides with a computed field"),
				});
			}

			if let FieldType::Enum { options } = &def.field_type {
				if options.is_empty() {
					return Err(ContentError::InvalidDocumentType {
						name: config.name.clone(),
						reason: format!("enum field `{field_name}` needs at least one option"),
					});
				}
			}

			if let Some(default) = &def.default {
				if def.field_type.coerce(default).is_none() {
					return Err(ContentError::InvalidDocumentType {
						name: config.name.clone(),
						reason: format!(
							"default for `{field_name}` is not a {}",
							def.field_type.describe()
						),
					});
				}
			}
		}

		let pattern = normalize_pattern(&config.file_path_pattern);
		let matcher = GlobBuilder::new(&pattern)
			.literal_separator(true)
			.build()
			.map_err(|e| ContentError::InvalidPattern {
				pattern: config.file_path_pattern.clone(),
				reason: e.to_string(),
			})?
			.compile_matcher();

		Ok(Self { config, matcher })
	}

	pub fn name(&self) -> &str {
		&self.config.name
	}

	pub fn content_type(&self) -> ContentType {
		self.config.content_type
	}

	/// True when a content-root-relative path belongs to this type.
	pub fn matches(&self, relative_path: &Path) -> bool {
		self.matcher.is_match(relative_path)
	}

	/// Validate authored fields. Declared fields are normalized and defaults
	/// filled in; undeclared fields are reported and dropped.
	pub fn validate_fields(&self, authored: &Map<String, Value>) -> FieldValidation {
		let mut validation = FieldValidation::default();

		for (name, def) in &self.config.fields {
			let value = authored.get(name).filter(|value| !value.is_null());
			let Some(value) = value else {
				if let Some(default) = def.default.as_ref().and_then(|d| def.field_type.coerce(d)) {
					validation.fields.insert(name.clone(), default);
				} else if def.required {
					validation
						.issues
						.push(FieldIssue::Missing { field: name.clone() });
				}
				continue;
			};

			match def.field_type.coerce(value) {
				Some(normalized) => {
					validation.fields.insert(name.clone(), normalized);
				}
				None => {
					validation.issues.push(FieldIssue::Incompatible {
						field: name.clone(),
						expected: def.field_type.describe(),
						found: value_kind(value).to_string(),
					});
				}
			}
		}

		for name in authored.keys() {
			if !self.config.fields.contains_key(name) {
				validation
					.issues
					.push(FieldIssue::Extra { field: name.clone() });
			}
		}

		validation
	}
}

/// Strip the leading `./` the pattern may be written with; matching always
/// happens against paths relative to the content directory.
fn normalize_pattern(pattern: &str) -> String {
	let mut pattern = pattern.trim().replace('\\', "/");
	while let Some(stripped) = pattern.strip_prefix("./") {
		pattern = stripped.to_string();
	}
	pattern.trim_start_matches('/').to_string()
}

/// The compiled document types of a project, in declaration order.
#[derive(Debug, Clone, Default, Deref)]
pub struct DocumentTypes(Vec<DocumentType>);

impl DocumentTypes {
	/// Compile every configured document type, rejecting duplicate names.
	pub fn compile(configs: &[DocumentTypeConfig]) -> ContentResult<Self> {
		let mut types: Vec<DocumentType> = Vec::with_capacity(configs.len());
		for config in configs {
			if types.iter().any(|existing| existing.name() == config.name) {
				return Err(ContentError::DuplicateDocumentType(config.name.clone()));
			}
			types.push(DocumentType::compile(config.clone())?);
		}

		Ok(Self(types))
	}

	/// All document types whose pattern matches `relative_path`, in
	/// declaration order.
	pub fn matching(&self, relative_path: &Path) -> Vec<&DocumentType> {
		self.0
			.iter()
			.filter(|doc_type| doc_type.matches(relative_path))
			.collect()
	}

	pub fn get(&self, name: &str) -> Option<&DocumentType> {
		self.0.iter().find(|doc_type| doc_type.name() == name)
	}
}
