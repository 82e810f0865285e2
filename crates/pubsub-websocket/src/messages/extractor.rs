use serde_json::{Map, Value};

use super::error::{MessageError, Result};

/// Field access over an untrusted JSON document with contextual errors
pub(crate) struct JsonExtractor<'a> {
	value: &'a Value,
	context: &'static str,
}

impl<'a> JsonExtractor<'a> {
	pub fn new(value: &'a Value, context: &'static str) -> Self {
		Self { value, context }
	}

	fn get(&self, field: &'static str) -> Result<&'a Value> {
		self.value.get(field).ok_or(MessageError::MissingField { field, context: self.context })
	}

	pub fn get_string(&self, field: &'static str) -> Result<&'a str> {
		self.get(field)?.as_str().ok_or(MessageError::InvalidFieldType {
			field,
			context: self.context,
			expected: "string",
		})
	}

	pub fn get_object(&self, field: &'static str) -> Result<&'a Map<String, Value>> {
		self.get(field)?.as_object().ok_or(MessageError::InvalidFieldType {
			field,
			context: self.context,
			expected: "object",
		})
	}

	pub fn get_array(&self, field: &'static str) -> Result<&'a Vec<Value>> {
		self.get(field)?.as_array().ok_or(MessageError::InvalidFieldType {
			field,
			context: self.context,
			expected: "array",
		})
	}

	/// Optional string field: absent or non-string decodes to `None`
	pub fn optional_string(&self, field: &'static str) -> Option<&'a str> {
		self.value.get(field).and_then(Value::as_str)
	}
}
