//! built-in reference schema
//!
//! The reference document lists known usage attributes per resource type, keyed as
//! `<resource type>.<example name>`. Types are derived by cutting the key at the first `.`, so several
//! examples of the same type add up to one attribute list (first declaration of a key wins).
//!
//! Attribute shapes are derived from the yaml scalar type:
//! - integers declare [ValueType::Int](crate::schema::ValueType::Int) with default `0`
//! - floats declare [ValueType::Float](crate::schema::ValueType::Float) with default `0.0`
//! - mappings declare groups (recursive)
//! - sequences declare string lists, the literal list is the default
//! - everything else is a string, its literal text is the default
//!
//! Trailing line comments become descriptions.
use crate::comments::LineComments;
use crate::schema::{UsageItem, UsageSlot};
use crate::value::scalar_text;
use indexmap::IndexMap;

const BUNDLED: &[u8] = include_bytes!("../assets/usage-reference.yml");

/// Reference usage schema by resource type
#[derive(Debug, Clone, Default)]
pub struct ReferenceSchema {
    types: IndexMap<String, Vec<UsageItem>>,
}

impl ReferenceSchema {
    /// The reference schema compiled into this crate
    pub fn bundled() -> Result<Self, SchemaError> {
        Self::load(Some(BUNDLED))
    }

    pub fn load(contents: Option<&[u8]>) -> Result<Self, SchemaError> {
        let contents = match contents {
            Some(contents) if !contents.iter().all(u8::is_ascii_whitespace) => contents,
            _ => return Err(SchemaError::ReferenceSchemaMissing),
        };

        let source = std::str::from_utf8(contents)
            .map_err(|e| SchemaError::MalformedSchema(format!("not utf-8: {e}")))?;
        let root: serde_yaml::Value = serde_yaml::from_str(source)?;
        let comments = LineComments::scan(source);

        let serde_yaml::Value::Mapping(root) = untag(root) else {
            return Err(SchemaError::MalformedSchema(
                "document root is not a mapping".to_string(),
            ));
        };

        let (entries, mut path) = match root.get("resource_usage") {
            Some(resource_usage) => match untag(resource_usage.clone()) {
                serde_yaml::Value::Mapping(entries) => {
                    (entries, vec!["resource_usage".to_string()])
                }
                _ => {
                    return Err(SchemaError::MalformedSchema(
                        "resource_usage is not a mapping".to_string(),
                    ))
                }
            },
            None => (root, vec![]),
        };

        let mut schema = Self::default();
        for (key, value) in entries {
            let Some(key) = key.as_str().map(str::to_string) else {
                return Err(SchemaError::MalformedSchema(format!(
                    "resource key {key:?} is not a string"
                )));
            };

            let serde_yaml::Value::Mapping(attributes) = untag(value) else {
                return Err(SchemaError::MalformedSchema(format!(
                    "{key}: expected a mapping of attributes"
                )));
            };

            let resource_type = key.split('.').next().unwrap_or(&key).to_string();
            path.push(key);
            let items = parse_items(attributes, &mut path, &comments)?;
            path.pop();

            tracing::trace!(%resource_type, count = items.len(), "reference schema entry");
            absorb(schema.types.entry(resource_type).or_default(), items);
        }

        tracing::debug!(types = schema.types.len(), "reference schema loaded");
        Ok(schema)
    }

    /// Attributes of a resource type (`aws_instance`, ...)
    pub fn get(&self, resource_type: &str) -> Option<&[UsageItem]> {
        self.types.get(resource_type).map(Vec::as_slice)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Vec<UsageItem>)> for ReferenceSchema {
    fn from_iter<T: IntoIterator<Item = (String, Vec<UsageItem>)>>(iter: T) -> Self {
        let mut schema = Self::default();
        for (resource_type, items) in iter {
            absorb(schema.types.entry(resource_type).or_default(), items);
        }
        schema
    }
}

fn parse_items(
    mapping: serde_yaml::Mapping,
    path: &mut Vec<String>,
    comments: &LineComments,
) -> Result<Vec<UsageItem>, SchemaError> {
    use serde_yaml::Value as Yaml;

    let mut items = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(key) = scalar_text(&key) else {
            return Err(SchemaError::MalformedSchema(format!(
                "{}: non-scalar attribute key",
                path.join(".")
            )));
        };
        path.push(key.clone());

        let item = match untag(value) {
            Yaml::Null => {
                return Err(SchemaError::MalformedSchema(format!(
                    "{}: attribute without a value",
                    path.join(".")
                )))
            }
            Yaml::Number(number) if number.is_f64() => UsageItem::float(key, 0.0),
            Yaml::Number(_) => UsageItem::int(key, 0),
            Yaml::Mapping(children) => {
                UsageItem::group(key, parse_items(children, path, comments)?)
            }
            Yaml::Sequence(sequence) => {
                let list = sequence
                    .iter()
                    .map(scalar_text)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        SchemaError::MalformedSchema(format!(
                            "{}: lists may only contain scalars",
                            path.join(".")
                        ))
                    })?;
                UsageItem::string_list(key, list)
            }
            Yaml::String(s) => UsageItem::string(key, s),
            Yaml::Bool(bool) => UsageItem::string(key, bool.to_string()),
            Yaml::Tagged(_) => unreachable!("untagged above"),
        };

        let description = comments.get(path.as_slice()).unwrap_or_default();
        items.push(item.with_description(description));
        path.pop();
    }

    Ok(items)
}

/// Add items that are not yet known, the first declaration of a key wins
fn absorb(known: &mut Vec<UsageItem>, items: Vec<UsageItem>) {
    for item in items {
        match known.iter_mut().find(|existing| existing.key == item.key) {
            None => known.push(item),
            Some(existing) => {
                if let (UsageSlot::Group(known_children), UsageSlot::Group(children)) =
                    (&mut existing.slot, item.slot)
                {
                    absorb(known_children, children);
                }
            }
        }
    }
}

fn untag(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(tagged.value),
        value => value,
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("Could not find reference usage schema")]
    ReferenceSchemaMissing,
    #[error("Malformed reference usage schema: {0}")]
    MalformedSchema(String),
    #[error("Unable to parse reference usage schema")]
    Parse(#[from] serde_yaml::Error),
}
