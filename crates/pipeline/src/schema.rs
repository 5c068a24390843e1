//! Best-effort structural validation of structured summaries.
//!
//! Schemas are written as JSON Schema documents. Only the subset needed for
//! summary records is supported: `type` (`object`, `array`, `string`,
//! `integer`, `number`, `boolean`), `properties`, `required` and a single
//! `items` schema. Keys not declared in an object schema are allowed, and
//! annotation keywords such as `description` are ignored.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// One node of a declared output schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
    Array(Box<SchemaNode>),
    String,
    Integer,
    Number,
    Boolean,
}

/// A place where a value does not conform to its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON-pointer-like path, `$` for the root.
    pub path: String,
    pub message: String,
}

impl SchemaNode {
    /// Build an object node.
    pub fn object<const P: usize, const R: usize>(
        properties: [(&str, SchemaNode); P],
        required: [&str; R],
    ) -> Self {
        Self::Object {
            properties: properties
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
            required: required.iter().map(ToString::to_string).collect(),
        }
    }

    /// Build an array node.
    pub fn array(items: SchemaNode) -> Self {
        Self::Array(Box::new(items))
    }

    /// Read a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] naming the first node without a
    /// supported single `type`, or a malformed `properties`, `required` or
    /// `items` keyword.
    pub fn from_json_schema(document: &Value) -> Result<Self> {
        Self::read(document, "$")
    }

    fn read(node: &Value, path: &str) -> Result<Self> {
        let kind = node
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_schema(path, "\"type\" must name a single type"))?;

        match kind {
            "object" => {
                let properties = match node.get("properties") {
                    None => Vec::new(),
                    Some(Value::Object(map)) => map
                        .iter()
                        .map(|(name, child)| Ok((name.clone(), Self::read(child, &format!("{path}.{name}"))?)))
                        .collect::<Result<Vec<_>>>()?,
                    Some(_) => return Err(Error::invalid_schema(path, "\"properties\" must be an object")),
                };
                let required = match node.get("required") {
                    None => Vec::new(),
                    Some(Value::Array(keys)) => keys
                        .iter()
                        .map(|key| {
                            key.as_str()
                                .map(ToString::to_string)
                                .ok_or_else(|| Error::invalid_schema(path, "\"required\" must list strings"))
                        })
                        .collect::<Result<Vec<_>>>()?,
                    Some(_) => return Err(Error::invalid_schema(path, "\"required\" must be an array")),
                };
                Ok(Self::Object { properties, required })
            }
            "array" => {
                let items = node
                    .get("items")
                    .ok_or_else(|| Error::invalid_schema(path, "array schema needs \"items\""))?;
                Ok(Self::array(Self::read(items, &format!("{path}[]"))?))
            }
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            other => Err(Error::invalid_schema(path, format!("unsupported type '{other}'"))),
        }
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::Object { .. } => "object",
            Self::Array(_) => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Validate `value`, collecting every violation.
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.walk(value, "$", &mut violations);
        violations
    }

    fn walk(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match (self, value) {
            (Self::Object { properties, required }, Value::Object(map)) => {
                for key in required.iter().filter(|key| !map.contains_key(key.as_str())) {
                    out.push(Violation {
                        path: path.to_string(),
                        message: format!("missing required property '{key}'"),
                    });
                }
                for (name, node) in properties {
                    if let Some(child) = map.get(name) {
                        node.walk(child, &format!("{path}.{name}"), out);
                    }
                }
            }
            (Self::Array(items), Value::Array(values)) => {
                for (i, child) in values.iter().enumerate() {
                    items.walk(child, &format!("{path}[{i}]"), out);
                }
            }
            (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Number, Value::Number(_)) => {}
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {}
            (node, other) => out.push(Violation {
                path: path.to_string(),
                message: format!("expected {}, found {}", node.type_name(), json_type(other)),
            }),
        }
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON Schema document for structured regulatory-analysis summaries.
pub fn regulatory_schema_document() -> Value {
    json!({
        "type": "object",
        "required": [
            "regulatory_context", "requirements", "impact_and_risk", "ambiguities",
            "executive_summary", "key_obligations_table", "responsibility_matrix", "visual_aids"
        ],
        "properties": {
            "regulatory_context": {
                "type": "object",
                "required": ["issuer", "originalCircular", "withdrawal"],
                "properties": {
                    "issuer": { "type": "string" },
                    "originalCircular": {
                        "type": "object",
                        "required": ["number", "issueDate", "scope"],
                        "properties": {
                            "number": { "type": "integer" },
                            "issueDate": { "type": "string" },
                            "scope": { "type": "string" }
                        }
                    },
                    "withdrawal": {
                        "type": "object",
                        "required": ["circularNumber", "effectiveDate", "issuedBy"],
                        "properties": {
                            "circularNumber": { "type": "integer" },
                            "effectiveDate": { "type": "string" },
                            "issuedBy": { "type": "string" }
                        }
                    }
                }
            },
            "requirements": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "description", "status"],
                    "properties": {
                        "id": { "type": "integer" },
                        "description": { "type": "string" },
                        "status": { "type": "string" }
                    }
                }
            },
            "impact_and_risk": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["risk", "impact"],
                    "properties": {
                        "risk": { "type": "string" },
                        "impact": { "type": "string" }
                    }
                }
            },
            "ambiguities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["detail"],
                    "properties": { "detail": { "type": "string" } }
                }
            },
            "executive_summary": { "type": "string" },
            "key_obligations_table": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["obligation", "description"],
                    "properties": {
                        "obligation": { "type": "string" },
                        "description": { "type": "string" }
                    }
                }
            },
            "responsibility_matrix": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["role", "responsibility"],
                    "properties": {
                        "role": { "type": "string" },
                        "responsibility": { "type": "string" }
                    }
                }
            },
            "visual_aids": {
                "type": "object",
                "required": ["timeline"],
                "properties": {
                    "timeline": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["date", "event"],
                            "properties": {
                                "date": { "type": "string" },
                                "event": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Schema for structured regulatory-analysis summaries.
///
/// # Errors
///
/// Returns [`Error::InvalidSchema`] if the bundled document cannot be read.
pub fn regulatory_schema() -> Result<SchemaNode> {
    SchemaNode::from_json_schema(&regulatory_schema_document())
}
