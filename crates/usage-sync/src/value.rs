//! value representation
//!
//! Usage attribute values come from three places: the existing usage file, schema defaults and estimator
//! output. All of them are reduced to the following data types
//! - integer (signed, i64)
//! - float (f64)
//! - string (utf-8)
//! - string list
//! - group (order-preserving "map" of nested values, where the key is of type string)
//!
//! Additionally:
//! - there is no `null`. A `null` in a yaml document means "no value" and is dropped while converting.
//! - booleans are carried as their literal text
//! - sequences are only representable when every element is a scalar
//!
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// Plain key → value map, as handed to estimators
pub type AttributeMap = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
    Group(AttributeMap),
}

impl Value {
    /// Convert a parsed yaml node
    ///
    /// Returns `Ok(None)` for nodes that carry no representable value (`null`, sequences of mappings).
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Option<Value>, MalformedValue> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => None,
            Yaml::Bool(bool) => Some(Value::String(bool.to_string())),
            Yaml::Number(number) => Some(number.into()),
            Yaml::String(s) => Some(Value::String(s)),
            Yaml::Sequence(sequence) => {
                let mut list = Vec::with_capacity(sequence.len());
                for element in sequence {
                    let Some(text) = scalar_text(&element) else {
                        tracing::trace!(?element, "non-scalar sequence element, dropping sequence");
                        return Ok(None);
                    };
                    list.push(text);
                }
                Some(Value::StringList(list))
            }
            Yaml::Mapping(mapping) => Some(Value::Group(attribute_map_from_yaml(mapping)?)),
            Yaml::Tagged(tagged) => Value::from_yaml(tagged.value)?,
        })
    }

    pub fn as_group(&self) -> Option<&AttributeMap> {
        match self {
            Value::Group(group) => Some(group),
            _ => None,
        }
    }
}

/// Convert a yaml mapping into an [AttributeMap], dropping entries without a value
pub fn attribute_map_from_yaml(mapping: serde_yaml::Mapping) -> Result<AttributeMap, MalformedValue> {
    let mut attributes = AttributeMap::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(key) = scalar_text(&key) else {
            return Err(MalformedValue(format!("non-scalar mapping key {key:?}")));
        };

        if let Some(value) = Value::from_yaml(value)? {
            attributes.insert(key, value);
        }
    }
    Ok(attributes)
}

/// Literal text of a scalar yaml node
pub(crate) fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Bool(bool) => Some(bool.to_string()),
        Yaml::Number(number) => Some(number.to_string()),
        Yaml::String(s) => Some(s.clone()),
        Yaml::Tagged(tagged) => scalar_text(&tagged.value),
        Yaml::Null | Yaml::Sequence(_) | Yaml::Mapping(_) => None,
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("malformed value: {0}")]
pub struct MalformedValue(pub String);

impl From<serde_yaml::Number> for Value {
    fn from(value: serde_yaml::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Int(int);
        }

        // u64 beyond i64::MAX ends up here as well
        Value::Float(value.as_f64().unwrap_or(f64::NAN))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::StringList(value)
    }
}

impl From<AttributeMap> for Value {
    fn from(value: AttributeMap) -> Self {
        Value::Group(value)
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::StringList(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Group(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Option<Value> {
        Value::from_yaml(serde_yaml::from_str(yaml).expect("valid yaml")).expect("well formed")
    }

    #[test]
    fn scalars() {
        assert_eq!(parse("42"), Some(Value::Int(42)));
        assert_eq!(parse("4.5"), Some(Value::Float(4.5)));
        assert_eq!(parse("linux"), Some(Value::from("linux")));
        assert_eq!(parse("true"), Some(Value::from("true")));
        assert_eq!(parse("~"), None);
    }

    #[test]
    fn sequences_of_scalars_become_string_lists() {
        assert_eq!(
            parse("[a, 1, false]"),
            Some(Value::StringList(vec![
                "a".to_string(),
                "1".to_string(),
                "false".to_string()
            ]))
        );
        assert_eq!(parse("[{a: 1}]"), None);
    }

    #[test]
    fn mappings_keep_order_and_drop_nulls() {
        let Some(Value::Group(group)) = parse("zeta: 1\nalpha: ~\nbeta: two") else {
            panic!("expected group");
        };
        assert_eq!(group.keys().collect::<Vec<_>>(), vec!["zeta", "beta"]);
    }

    #[test]
    fn non_scalar_keys_are_malformed() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("? [a, b]\n: 1").unwrap();
        assert!(Value::from_yaml(yaml).is_err());
    }
}
