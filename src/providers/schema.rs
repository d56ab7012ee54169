//! Typed tool descriptors.
//!
//! Tool parameters are described with [`ParamSchema`] rather than an open JSON
//! object, so malformed schemas are rejected before they reach a vendor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// JSON-schema subset used for tool parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamSchema {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
        allowed: Option<Vec<String>>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        items: Box<ParamSchema>,
    },
    Object(ObjectSchema),
}

impl ParamSchema {
    pub fn string() -> Self {
        ParamSchema::String {
            description: None,
            allowed: None,
        }
    }

    pub fn number_in(minimum: f64, maximum: f64) -> Self {
        ParamSchema::Number {
            description: None,
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    pub fn boolean() -> Self {
        ParamSchema::Boolean { description: None }
    }

    pub fn array_of(items: ParamSchema) -> Self {
        ParamSchema::Array {
            description: None,
            items: Box::new(items),
        }
    }

    /// Attach a human-readable description.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            ParamSchema::String { description, .. }
            | ParamSchema::Number { description, .. }
            | ParamSchema::Integer { description, .. }
            | ParamSchema::Boolean { description }
            | ParamSchema::Array { description, .. } => *description = text,
            ParamSchema::Object(obj) => obj.description = text,
        }
        self
    }

    fn validate(&self, path: &str) -> Result<(), GatewayError> {
        match self {
            ParamSchema::Number {
                minimum: Some(lo),
                maximum: Some(hi),
                ..
            } if lo > hi => Err(GatewayError::InvalidTool(format!(
                "{}: minimum {} exceeds maximum {}",
                path, lo, hi
            ))),
            ParamSchema::Integer {
                minimum: Some(lo),
                maximum: Some(hi),
                ..
            } if lo > hi => Err(GatewayError::InvalidTool(format!(
                "{}: minimum {} exceeds maximum {}",
                path, lo, hi
            ))),
            ParamSchema::String {
                allowed: Some(values),
                ..
            } if values.is_empty() => Err(GatewayError::InvalidTool(format!(
                "{}: enum must list at least one value",
                path
            ))),
            ParamSchema::Array { items, .. } => items.validate(&format!("{}[]", path)),
            ParamSchema::Object(obj) => obj.validate(path),
            _ => Ok(()),
        }
    }
}

/// An object with named properties and a required-list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an optional property.
    pub fn property(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a property and mark it required.
    pub fn required_property(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }

    fn validate(&self, path: &str) -> Result<(), GatewayError> {
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(GatewayError::InvalidTool(format!(
                    "{}: required property '{}' is not declared",
                    path, name
                )));
            }
        }
        for (name, schema) in &self.properties {
            schema.validate(&format!("{}.{}", path, name))?;
        }
        Ok(())
    }
}

/// A function the model may ask the caller to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: ObjectSchema,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ObjectSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Reject names vendors refuse and schemas whose required-list is dangling.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let name_ok = !self.name.is_empty()
            && self.name.len() <= 64
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !name_ok {
            return Err(GatewayError::InvalidTool(format!(
                "invalid tool name '{}'",
                self.name
            )));
        }
        self.parameters.validate(&self.name)
    }

    /// Convert to the OpenAI function schema format.
    pub fn to_schema(&self) -> serde_json::Value {
        let mut parameters = serde_json::to_value(&self.parameters)
            .unwrap_or_else(|_| serde_json::json!({}));
        if let Some(obj) = parameters.as_object_mut() {
            obj.insert("type".to_string(), serde_json::json!("object"));
        }
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": parameters,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_tool() -> Tool {
        Tool::new(
            "search_doctors",
            "Search doctors by specialty and city",
            ObjectSchema::new()
                .required_property("specialty", ParamSchema::string().describe("Medical specialty"))
                .property("city", ParamSchema::string())
                .property(
                    "max_results",
                    ParamSchema::Integer {
                        description: None,
                        minimum: Some(1),
                        maximum: None,
                    },
                ),
        )
    }

    #[test]
    fn test_to_schema_structure() {
        let schema = search_tool().to_schema();

        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "search_doctors");
        let params = &schema["function"]["parameters"];
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["specialty"]["type"], "string");
        assert_eq!(params["properties"]["specialty"]["description"], "Medical specialty");
        assert_eq!(params["properties"]["max_results"]["type"], "integer");
        assert_eq!(params["required"], serde_json::json!(["specialty"]));
    }

    #[test]
    fn test_nested_schema_serializes_constraints() {
        let tool = Tool::new(
            "analyze_reviews",
            "Structured analysis",
            ObjectSchema::new()
                .required_property("score", ParamSchema::number_in(0.0, 10.0))
                .required_property("pros", ParamSchema::array_of(ParamSchema::string())),
        );
        let params = &tool.to_schema()["function"]["parameters"];
        assert_eq!(params["properties"]["score"]["minimum"], 0.0);
        assert_eq!(params["properties"]["score"]["maximum"], 10.0);
        assert_eq!(params["properties"]["pros"]["type"], "array");
        assert_eq!(params["properties"]["pros"]["items"]["type"], "string");
    }

    #[test]
    fn test_schema_parses_from_json() {
        let raw = serde_json::json!({
            "properties": {
                "mode": { "type": "string", "enum": ["fast", "full"] },
                "filters": {
                    "type": "object",
                    "properties": { "lgbt": { "type": "boolean" } }
                }
            },
            "required": ["mode"]
        });
        let schema: ObjectSchema = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            schema.properties["filters"],
            ParamSchema::Object(_)
        ));
        match &schema.properties["mode"] {
            ParamSchema::String { allowed, .. } => {
                assert_eq!(allowed.as_ref().unwrap().len(), 2);
            }
            other => panic!("unexpected schema: {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_good_tool() {
        assert!(search_tool().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_required() {
        let mut tool = search_tool();
        tool.parameters.required.push("date".to_string());
        let err = tool.validate().unwrap_err();
        assert!(err.to_string().contains("'date'"));
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let tool = Tool::new("search doctors", "", ObjectSchema::new());
        assert!(tool.validate().is_err());

        let tool = Tool::new("", "", ObjectSchema::new());
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let tool = Tool::new(
            "rate",
            "",
            ObjectSchema::new().property("score", ParamSchema::number_in(10.0, 0.0)),
        );
        let err = tool.validate().unwrap_err();
        assert!(err.to_string().contains("rate.score"));
    }
}
