//! usage attribute trees
//!
//! A [UsageItem] is one attribute. Leaf attributes carry a default and, once resolved, a concrete value.
//! Group attributes own an ordered list of child items (recursive).
use crate::value::{AttributeMap, Value};

/// Shape of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    String,
    StringList,
    Group,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::String => f.write_str("string"),
            ValueType::StringList => f.write_str("string list"),
            ValueType::Group => f.write_str("group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageItem {
    pub key: String,
    pub description: String,
    pub slot: UsageSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsageSlot {
    /// Scalar or string list attribute
    ///
    /// `default_value` decides the [ValueType]. `value` always has the same variant as `default_value`.
    Leaf {
        default_value: Value,
        value: Option<Value>,
    },
    Group(Vec<UsageItem>),
}

impl UsageItem {
    pub fn int(key: impl Into<String>, default_value: i64) -> Self {
        Self::leaf(key, Value::Int(default_value))
    }

    pub fn float(key: impl Into<String>, default_value: f64) -> Self {
        Self::leaf(key, Value::Float(default_value))
    }

    pub fn string(key: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self::leaf(key, Value::String(default_value.into()))
    }

    pub fn string_list(key: impl Into<String>, default_value: Vec<String>) -> Self {
        Self::leaf(key, Value::StringList(default_value))
    }

    pub fn group(key: impl Into<String>, children: Vec<UsageItem>) -> Self {
        Self {
            key: key.into(),
            description: String::new(),
            slot: UsageSlot::Group(children),
        }
    }

    /// Leaf attribute with the given default
    ///
    /// A [Value::Group] default is turned into a group of leaves.
    pub fn leaf(key: impl Into<String>, default_value: Value) -> Self {
        let slot = match default_value {
            Value::Group(group) => UsageSlot::Group(
                group
                    .into_iter()
                    .map(|(key, value)| UsageItem::leaf(key, value))
                    .collect(),
            ),
            default_value => UsageSlot::Leaf {
                default_value,
                value: None,
            },
        };

        Self {
            key: key.into(),
            description: String::new(),
            slot,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set a concrete value (leaf items only)
    ///
    /// A value of another type than the default is ignored.
    pub fn with_value(mut self, new_value: impl Into<Value>) -> Self {
        let new_value = new_value.into();
        if let UsageSlot::Leaf {
            default_value,
            value,
        } = &mut self.slot
        {
            if std::mem::discriminant(default_value) == std::mem::discriminant(&new_value) {
                *value = Some(new_value);
            } else {
                tracing::warn!(key = %self.key, ?new_value, "ignoring value of the wrong type");
            }
        }
        self
    }

    pub fn value_type(&self) -> ValueType {
        match &self.slot {
            UsageSlot::Leaf { default_value, .. } => match default_value {
                Value::Int(_) => ValueType::Int,
                Value::Float(_) => ValueType::Float,
                Value::String(_) => ValueType::String,
                Value::StringList(_) => ValueType::StringList,
                Value::Group(_) => ValueType::Group,
            },
            UsageSlot::Group(_) => ValueType::Group,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            UsageSlot::Leaf { value, .. } => value.as_ref(),
            UsageSlot::Group(_) => None,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.slot {
            UsageSlot::Leaf { default_value, .. } => Some(default_value),
            UsageSlot::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[UsageItem] {
        match &self.slot {
            UsageSlot::Group(children) => children,
            UsageSlot::Leaf { .. } => &[],
        }
    }

    /// Child item by key (group items only)
    pub fn child(&self, key: &str) -> Option<&UsageItem> {
        self.children().iter().find(|child| child.key == key)
    }

    /// Whether this item, or any item below it, carries a concrete value
    pub fn is_set(&self) -> bool {
        match &self.slot {
            UsageSlot::Leaf { value, .. } => value.is_some(),
            UsageSlot::Group(children) => children.iter().any(UsageItem::is_set),
        }
    }

    /// Tree of default values
    pub fn default_tree(&self) -> Value {
        match &self.slot {
            UsageSlot::Leaf { default_value, .. } => default_value.clone(),
            UsageSlot::Group(children) => Value::Group(
                children
                    .iter()
                    .map(|child| (child.key.clone(), child.default_tree()))
                    .collect(),
            ),
        }
    }
}

/// Resolved attribute tree of one resource
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct ResourceUsage {
    /// resource address
    pub key: String,
    pub items: Vec<UsageItem>,
}

impl ResourceUsage {
    pub fn has_usage(&self) -> bool {
        self.items.iter().any(UsageItem::is_set)
    }

    pub fn get(&self, key: &str) -> Option<&UsageItem> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Plain map of the resolved values, groups unwrap into nested maps
    pub fn to_attribute_map(&self) -> AttributeMap {
        attribute_map(&self.items)
    }
}

fn attribute_map(items: &[UsageItem]) -> AttributeMap {
    let mut map = AttributeMap::new();
    for item in items {
        match &item.slot {
            UsageSlot::Leaf {
                value: Some(value), ..
            } => {
                map.insert(item.key.clone(), value.clone());
            }
            UsageSlot::Leaf { value: None, .. } => {}
            UsageSlot::Group(children) => {
                let children = attribute_map(children);
                if !children.is_empty() {
                    map.insert(item.key.clone(), Value::Group(children));
                }
            }
        }
    }
    map
}
