//! Typed access to the hash attributes of a helper call, e.g.
//! `{{datetime delta_days=3 format="YYYY"}}`.
use crate::error::AttributeError;
use crate::js_value::{parse_float, to_js_string, truthy};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValueType {
    Number,
    String,
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

/// One accepted attribute and the value used when it is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    pub name: &'static str,
    pub value_type: AttributeValueType,
    pub default_value: AttributeValue,
}

impl AttributeDefinition {
    pub fn number(name: &'static str, default: f64) -> Self {
        Self {
            name,
            value_type: AttributeValueType::Number,
            default_value: AttributeValue::Number(default),
        }
    }

    pub fn string(name: &'static str, default: &str) -> Self {
        Self {
            name,
            value_type: AttributeValueType::String,
            default_value: AttributeValue::String(default.to_string()),
        }
    }

    pub fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            value_type: AttributeValueType::Boolean,
            default_value: AttributeValue::Boolean(default),
        }
    }
}

/// Attribute values by name. Every name of the schema is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAttributes(BTreeMap<&'static str, AttributeValue>);

impl ParsedAttributes {
    /// `0` if `name` is not a number attribute.
    pub fn number(&self, name: &str) -> f64 {
        match self.0.get(name) {
            Some(AttributeValue::Number(n)) => *n,
            _ => 0.0,
        }
    }

    /// `""` if `name` is not a string attribute.
    pub fn string(&self, name: &str) -> &str {
        match self.0.get(name) {
            Some(AttributeValue::String(s)) => s,
            _ => "",
        }
    }

    /// `false` if `name` is not a boolean attribute.
    pub fn boolean(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(AttributeValue::Boolean(true)))
    }
}

/// Converts raw attributes according to a schema. Attributes not in the
/// schema are ignored.
#[derive(Debug, Clone)]
pub struct AttributeParser<'a> {
    schema: &'a [AttributeDefinition],
}

impl<'a> AttributeParser<'a> {
    pub fn new(schema: &'a [AttributeDefinition]) -> Self {
        Self { schema }
    }

    fn parse_attribute(
        attr: &AttributeDefinition,
        raw: &Value,
    ) -> Result<AttributeValue, AttributeError> {
        Ok(match attr.value_type {
            AttributeValueType::Boolean => AttributeValue::Boolean(truthy(raw)),
            AttributeValueType::Number => {
                let v = parse_float(raw);
                if v.is_nan() {
                    return Err(AttributeError::NotANumber {
                        value: to_js_string(raw),
                        name: attr.name.to_string(),
                    });
                }
                AttributeValue::Number(v)
            }
            AttributeValueType::String => AttributeValue::String(to_js_string(raw)),
        })
    }

    pub fn parse(&self, raw: &Map<String, Value>) -> Result<ParsedAttributes, AttributeError> {
        let mut parsed = BTreeMap::new();
        for attr in self.schema {
            let value = match raw.get(attr.name) {
                Some(v) => Self::parse_attribute(attr, v)?,
                None => attr.default_value.clone(),
            };
            parsed.insert(attr.name, value);
        }
        Ok(ParsedAttributes(parsed))
    }
}
