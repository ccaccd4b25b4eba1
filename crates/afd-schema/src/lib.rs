// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input schema abstraction for AFD commands.
//!
//! A [`Schema`] wraps a compiled JSON Schema validator and the raw schema
//! document behind three operations: [`Schema::parse`] (validate + decode),
//! [`Schema::json_schema`] (wire projection for `tools/list` and the schema
//! bootstrap tool), and [`Schema::shape`] (a traversal view used by the
//! surface-complexity analyzer). The projection never strips composition
//! keywords (`oneOf`/`anyOf`/`allOf`/`const`) — the analyzer and MCP clients
//! depend on them being truthful.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure to build a [`Schema`] from a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document itself is not a valid JSON Schema.
    #[error("invalid JSON schema: {0}")]
    InvalidSchema(String),
}

/// The outcome of [`Schema::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Input satisfied the schema and decoded into `T`.
    Ok(T),
    /// Input failed validation; `issues` are human-readable, one per
    /// violation, in the order the validator produced them.
    Err(Vec<String>),
}

impl<T> ParseOutcome<T> {
    /// `true` for [`ParseOutcome::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Convert into a [`Result`], discarding issue detail.
    pub fn into_result(self) -> Result<T, Vec<String>> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(issues) => Err(issues),
        }
    }
}

/// A validated input schema paired with its compiled validator.
///
/// Cheap to clone the underlying document but the compiled validator is
/// rebuilt, so prefer holding a `Schema` behind an `Arc` in a
/// [`CommandDefinition`](../afd_registry/struct.CommandDefinition.html) (this
/// crate has no dependency on `afd-registry` to avoid a cycle).
pub struct Schema {
    document: Value,
    validator: jsonschema::Validator,
}

impl Schema {
    /// Derive a schema from a Rust type implementing [`JsonSchema`].
    pub fn for_type<T: JsonSchema>() -> Result<Self, SchemaError> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(root).map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        Self::from_value(document)
    }

    /// Build a schema from a raw JSON Schema document (e.g. hand-authored,
    /// or loaded from a tool definition on the wire).
    pub fn from_value(document: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(&document)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        Ok(Self { document, validator })
    }

    /// Validate `raw` and, on success, decode it into `T`.
    ///
    /// Decoding failure after a successful schema validation indicates the
    /// schema and `T` have drifted; this is reported as a single issue
    /// rather than panicking.
    pub fn parse<T: DeserializeOwned>(&self, raw: &Value) -> ParseOutcome<T> {
        let issues: Vec<String> = self
            .validator
            .iter_errors(raw)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        if !issues.is_empty() {
            return ParseOutcome::Err(issues);
        }
        match serde_json::from_value(raw.clone()) {
            Ok(value) => ParseOutcome::Ok(value),
            Err(e) => ParseOutcome::Err(vec![format!("decode error: {e}")]),
        }
    }

    /// `true` if `raw` satisfies the schema, without decoding.
    #[must_use]
    pub fn is_valid(&self, raw: &Value) -> bool {
        self.validator.is_valid(raw)
    }

    /// The JSON Schema document, as sent over the wire. Composition
    /// keywords are preserved verbatim.
    #[must_use]
    pub fn json_schema(&self) -> &Value {
        &self.document
    }

    /// A traversal view over the root of the schema document.
    #[must_use]
    pub fn shape(&self) -> Shape<'_> {
        Shape { value: &self.document }
    }
}

// ---------------------------------------------------------------------------
// Shape: a read-only traversal over a JSON Schema document
// ---------------------------------------------------------------------------

/// A borrowed view over one node of a JSON Schema document, exposing the
/// composition keywords the complexity analyzer and docs generator need.
#[derive(Clone, Copy)]
pub struct Shape<'a> {
    value: &'a Value,
}

impl<'a> Shape<'a> {
    /// Wrap an arbitrary schema fragment (e.g. a `properties` entry or an
    /// `items` schema) for traversal.
    #[must_use]
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// The raw JSON value backing this node.
    #[must_use]
    pub fn raw(&self) -> &'a Value {
        self.value
    }

    /// The `type` keyword, if a single string (schemas using `type: [...]`
    /// report `None` here; callers may still read `.raw()`).
    #[must_use]
    pub fn schema_type(&self) -> Option<&'a str> {
        self.value.get("type")?.as_str()
    }

    /// `properties` as a name → sub-shape map, in document order.
    #[must_use]
    pub fn properties(&self) -> Vec<(String, Shape<'a>)> {
        match self.value.get("properties").and_then(Value::as_object) {
            Some(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), Shape::new(v)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// `required` property names.
    #[must_use]
    pub fn required(&self) -> Vec<String> {
        match self.value.get("required").and_then(Value::as_array) {
            Some(arr) => arr
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            None => Vec::new(),
        }
    }

    /// `enum` values, if present.
    #[must_use]
    pub fn enum_values(&self) -> Option<&'a Vec<Value>> {
        self.value.get("enum").and_then(Value::as_array)
    }

    /// `const` value, if present.
    #[must_use]
    pub fn const_value(&self) -> Option<&'a Value> {
        self.value.get("const")
    }

    /// `format` keyword.
    #[must_use]
    pub fn format(&self) -> Option<&'a str> {
        self.value.get("format")?.as_str()
    }

    /// `pattern` keyword.
    #[must_use]
    pub fn pattern(&self) -> Option<&'a str> {
        self.value.get("pattern")?.as_str()
    }

    /// `minimum` keyword.
    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.value.get("minimum")?.as_f64()
    }

    /// `maximum` keyword.
    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.value.get("maximum")?.as_f64()
    }

    /// `oneOf` variants.
    #[must_use]
    pub fn one_of(&self) -> Vec<Shape<'a>> {
        self.array_of("oneOf")
    }

    /// `anyOf` variants.
    #[must_use]
    pub fn any_of(&self) -> Vec<Shape<'a>> {
        self.array_of("anyOf")
    }

    /// `allOf` members.
    #[must_use]
    pub fn all_of(&self) -> Vec<Shape<'a>> {
        self.array_of("allOf")
    }

    /// `not` schema.
    #[must_use]
    pub fn not(&self) -> Option<Shape<'a>> {
        self.value.get("not").map(Shape::new)
    }

    /// `items` schema (array element schema).
    #[must_use]
    pub fn items(&self) -> Option<Shape<'a>> {
        self.value.get("items").map(Shape::new)
    }

    fn array_of(&self, key: &str) -> Vec<Shape<'a>> {
        match self.value.get(key).and_then(Value::as_array) {
            Some(arr) => arr.iter().map(Shape::new).collect(),
            None => Vec::new(),
        }
    }

    /// `true` if this node's type is `"null"` — used to detect nullable
    /// wrapper variants inside `oneOf`/`anyOf`.
    #[must_use]
    pub fn is_null_type(&self) -> bool {
        self.schema_type() == Some("null")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Todo {
        title: String,
        #[serde(default)]
        done: bool,
    }

    #[test]
    fn for_type_round_trips_valid_input() {
        let schema = Schema::for_type::<Todo>().unwrap();
        let outcome: ParseOutcome<Todo> =
            schema.parse(&json!({"title": "Buy milk", "done": false}));
        assert!(outcome.is_ok());
    }

    #[test]
    fn for_type_rejects_missing_required_field() {
        let schema = Schema::for_type::<Todo>().unwrap();
        let outcome: ParseOutcome<Todo> = schema.parse(&json!({}));
        assert!(!outcome.is_ok());
        match outcome {
            ParseOutcome::Err(issues) => assert!(!issues.is_empty()),
            ParseOutcome::Ok(_) => unreachable!(),
        }
    }

    #[test]
    fn json_schema_preserves_one_of() {
        let doc = json!({
            "oneOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}},
                {"type": "null"}
            ]
        });
        let schema = Schema::from_value(doc.clone()).unwrap();
        assert_eq!(schema.json_schema(), &doc);
        assert_eq!(schema.shape().one_of().len(), 2);
    }

    #[test]
    fn shape_exposes_composition_keywords() {
        let doc = json!({
            "type": "object",
            "properties": {
                "kind": {"enum": ["a", "b"]},
                "count": {"minimum": 0, "maximum": 10}
            },
            "required": ["kind"],
            "allOf": [{"type": "object"}],
        });
        let schema = Schema::from_value(doc).unwrap();
        let shape = schema.shape();
        assert_eq!(shape.required(), vec!["kind".to_string()]);
        let props = shape.properties();
        let kind = props.iter().find(|(k, _)| k == "kind").unwrap();
        assert!(kind.1.enum_values().is_some());
        let count = props.iter().find(|(k, _)| k == "count").unwrap();
        assert_eq!(count.1.minimum(), Some(0.0));
        assert_eq!(count.1.maximum(), Some(10.0));
        assert_eq!(shape.all_of().len(), 1);
    }

    #[test]
    fn is_null_type_detects_nullable_wrapper() {
        let doc = json!({"type": "null"});
        let schema = Schema::from_value(doc).unwrap();
        assert!(schema.shape().is_null_type());
    }

    #[test]
    fn is_valid_without_decoding() {
        let schema = Schema::for_type::<Todo>().unwrap();
        assert!(schema.is_valid(&json!({"title": "x"})));
        assert!(!schema.is_valid(&json!({"done": true})));
    }
}
