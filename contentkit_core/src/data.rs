use std::path::Path;

use serde_json::Value;

use crate::ContentError;
use crate::ContentResult;

/// Resolve the data format from a file extension (`json`, `yaml`, `yml`,
/// `toml`).
pub fn data_format_for(path: &Path) -> Option<String> {
	path.extension()
		.and_then(|ext| ext.to_str())
		.map(str::to_ascii_lowercase)
		.filter(|ext| matches!(ext.as_str(), "json" | "yaml" | "yml" | "toml"))
}

/// Parse a data document or a frontmatter block into a JSON value.
pub fn parse_data(content: &str, format: &str, path_display: &str) -> ContentResult<Value> {
	match format {
		"json" => serde_json::from_str(content).map_err(|e| ContentError::DataFile {
			path: path_display.to_string(),
			reason: e.to_string(),
		}),
		"toml" => {
			let toml_value: toml::Value =
				toml::from_str(content).map_err(|e| ContentError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				})?;
			toml_to_json(toml_value, path_display)
		}
		"yaml" | "yml" => {
			if content.trim().is_empty() {
				return Ok(Value::Object(serde_json::Map::new()));
			}
			serde_yaml_ng::from_str(content).map_err(|e| ContentError::DataFile {
				path: path_display.to_string(),
				reason: e.to_string(),
			})
		}
		other => Err(ContentError::UnsupportedDataFormat(other.to_string())),
	}
}

/// Convert a `toml::Value` to a `serde_json::Value`. Datetimes become their
/// string form so date fields can normalize them.
pub fn toml_to_json(value: toml::Value, path_display: &str) -> ContentResult<Value> {
	let json = match value {
		toml::Value::String(s) => Value::String(s),
		toml::Value::Integer(i) => Value::Number(i.into()),
		toml::Value::Float(f) => {
			Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				ContentError::UnconvertibleFloat {
					path: path_display.to_string(),
					value: f.to_string(),
				}
			})?)
		}
		toml::Value::Boolean(b) => Value::Bool(b),
		toml::Value::Datetime(dt) => Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			let items: ContentResult<Vec<Value>> = arr
				.into_iter()
				.map(|v| toml_to_json(v, path_display))
				.collect();
			Value::Array(items?)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k, toml_to_json(v, path_display)?);
			}
			Value::Object(map)
		}
	};

	Ok(json)
}
