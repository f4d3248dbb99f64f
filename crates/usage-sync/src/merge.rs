//! combine reference schema, declared schema and existing values into one tree per resource
//!
//! Shape and metadata come from the schemas. The resource's own declaration overrides the reference schema,
//! keys are merged by identity (recursively for groups) so merging twice never duplicates anything.
//!
//! Values are overlaid afterwards: every leaf asks the existing [UsageData] for a value of its own type.
//! Missing or incompatible values leave the item as it is.
use crate::reference::ReferenceSchema;
use crate::resource::Resource;
use crate::schema::{ResourceUsage, UsageItem, UsageSlot, ValueType};
use crate::usage_data::UsageData;
use crate::value::Value;

/// Build the tree of a resource from all schema sources and its existing values
#[tracing::instrument(level = "trace", skip_all, fields(address = %resource.name))]
pub fn merge_resource(
    resource: &Resource,
    reference: &ReferenceSchema,
    existing: Option<&UsageData>,
) -> ResourceUsage {
    let mut items = vec![];

    if let Some(reference_items) = reference_type(&resource.name).and_then(|t| reference.get(t)) {
        items = merge_items(&items, reference_items);
    }

    if let Some(declared) = &resource.usage_schema {
        items = merge_items(&items, declared);
    }

    if let Some(existing) = existing {
        items = resolve_items(&items, existing);
    }

    tracing::trace!(items = items.len(), "merged");
    ResourceUsage::new(resource.name.clone(), items)
}

/// Resource type used to look up the reference schema
///
/// This is the second to last segment of the address, which skips module prefixes
/// (`module.app.aws_instance.web` → `aws_instance`).
pub fn reference_type(address: &str) -> Option<&str> {
    let segments: Vec<&str> = address.split('.').collect();
    if segments.len() < 2 {
        return None;
    }

    Some(segments[segments.len() - 2])
}

/// Union of both item lists, `overlay` wins for shape and metadata
///
/// Keys keep the position of their first appearance, new keys are appended in `overlay` order.
pub fn merge_items(base: &[UsageItem], overlay: &[UsageItem]) -> Vec<UsageItem> {
    let mut merged = base.to_vec();

    for item in overlay {
        match merged.iter().position(|existing| existing.key == item.key) {
            Some(index) => merged[index] = merge_item(&merged[index], item),
            None => merged.push(item.clone()),
        }
    }

    merged
}

fn merge_item(base: &UsageItem, overlay: &UsageItem) -> UsageItem {
    let description = if overlay.description.is_empty() {
        base.description.clone()
    } else {
        overlay.description.clone()
    };

    let slot = match (&base.slot, &overlay.slot) {
        (UsageSlot::Group(base_children), UsageSlot::Group(overlay_children)) => {
            UsageSlot::Group(merge_items(base_children, overlay_children))
        }
        (
            UsageSlot::Leaf {
                value: base_value, ..
            },
            UsageSlot::Leaf {
                default_value,
                value,
            },
        ) if base.value_type() == overlay.value_type() => UsageSlot::Leaf {
            default_value: default_value.clone(),
            value: value.clone().or_else(|| base_value.clone()),
        },
        _ => {
            tracing::warn!(
                key = %overlay.key,
                from = %base.value_type(),
                to = %overlay.value_type(),
                "usage attribute redeclared with a different type"
            );
            overlay.slot.clone()
        }
    };

    UsageItem {
        key: overlay.key.clone(),
        description,
        slot,
    }
}

/// Overlay values from `data` onto a new copy of `items`
pub fn resolve_items(items: &[UsageItem], data: &UsageData) -> Vec<UsageItem> {
    items.iter().map(|item| resolve_item(item, data)).collect()
}

fn resolve_item(item: &UsageItem, data: &UsageData) -> UsageItem {
    let slot = match &item.slot {
        UsageSlot::Leaf {
            default_value,
            value,
        } => {
            let found = typed_value(item.value_type(), &item.key, data);
            if let Some(found) = &found {
                tracing::trace!(address = %data.address, key = %item.key, ?found, "value resolved");
            }

            UsageSlot::Leaf {
                default_value: default_value.clone(),
                value: found.or_else(|| value.clone()),
            }
        }
        UsageSlot::Group(children) => {
            let nested = data.get_group(&item.key).unwrap_or_else(|| {
                UsageData::new(format!("{}.{}", data.address, item.key), Default::default())
            });
            UsageSlot::Group(resolve_items(children, &nested))
        }
    };

    UsageItem {
        key: item.key.clone(),
        description: item.description.clone(),
        slot,
    }
}

fn typed_value(value_type: ValueType, key: &str, data: &UsageData) -> Option<Value> {
    match value_type {
        ValueType::Int => data.get_int(key).map(Value::Int),
        ValueType::Float => data.get_float(key).map(Value::Float),
        ValueType::String => data.get_string(key).map(Value::String),
        ValueType::StringList => data.get_string_list(key).map(Value::StringList),
        ValueType::Group => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::AttributeMap;
    use pretty_assertions::assert_eq;

    fn keys(items: &[UsageItem]) -> Vec<&str> {
        items.iter().map(|item| item.key.as_str()).collect()
    }

    fn existing(address: &str, yaml: &str) -> UsageData {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).expect("valid yaml");
        UsageData::new(
            address.to_string(),
            crate::value::attribute_map_from_yaml(mapping).expect("well formed"),
        )
    }

    fn reference() -> ReferenceSchema {
        [(
            "aws_lambda_function".to_string(),
            vec![
                UsageItem::int("monthly_requests", 0).with_description("Monthly requests."),
                UsageItem::int("request_duration_ms", 0).with_description("Duration."),
            ],
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn reference_type_skips_module_prefix() {
        assert_eq!(reference_type("aws_instance.web"), Some("aws_instance"));
        assert_eq!(
            reference_type("module.app.aws_instance.web"),
            Some("aws_instance")
        );
        assert_eq!(reference_type("aws_instance"), None);
        assert_eq!(reference_type(""), None);
    }

    #[test]
    fn declared_schema_wins() {
        let base = vec![UsageItem::int("hours", 0).with_description("from reference")];
        let overlay = vec![UsageItem::int("hours", 730).with_description("declared")];

        let merged = merge_items(&base, &overlay);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].default_value(), Some(&Value::Int(730)));
        assert_eq!(merged[0].description, "declared");
    }

    #[test]
    fn empty_declared_description_keeps_reference_description() {
        let base = vec![UsageItem::int("hours", 0).with_description("from reference")];
        let overlay = vec![UsageItem::int("hours", 730)];

        let merged = merge_items(&base, &overlay);
        assert_eq!(merged[0].description, "from reference");
    }

    #[test]
    fn recursive_group_merge() {
        let base = vec![UsageItem::group(
            "standard",
            vec![
                UsageItem::int("a", 0),
                UsageItem::int("b", 0).with_description("reference b"),
            ],
        )];
        let overlay = vec![UsageItem::group(
            "standard",
            vec![
                UsageItem::int("b", 5).with_description("declared b"),
                UsageItem::int("c", 0),
            ],
        )];

        let merged = merge_items(&base, &overlay);
        let children = merged[0].children();
        assert_eq!(keys(children), vec!["a", "b", "c"]);
        assert_eq!(children[1].description, "declared b");
        assert_eq!(children[1].default_value(), Some(&Value::Int(5)));
    }

    #[test]
    fn merge_is_idempotent() {
        let base = vec![
            UsageItem::int("a", 0),
            UsageItem::group("g", vec![UsageItem::string("x", "y")]),
        ];
        let overlay = vec![
            UsageItem::float("b", 1.5),
            UsageItem::group("g", vec![UsageItem::int("z", 1)]),
        ];

        let once = merge_items(&base, &overlay);
        let twice = merge_items(&once, &overlay);
        assert_eq!(once, twice);
        assert_eq!(keys(&twice), vec!["a", "g", "b"]);
    }

    #[test]
    fn conflicting_type_takes_declared_shape() {
        let base = vec![UsageItem::int("size", 0)];
        let overlay = vec![UsageItem::string("size", "small")];

        let merged = merge_items(&base, &overlay);
        assert_eq!(merged[0].value_type(), ValueType::String);
    }

    #[test]
    fn existing_value_overlay() {
        let resource = Resource::new("aws_lambda_function.api");
        let data = existing(
            "aws_lambda_function.api",
            "monthly_requests: 42\nrequest_duration_ms: slow",
        );

        let usage = merge_resource(&resource, &reference(), Some(&data));
        assert_eq!(usage.items[0].value(), Some(&Value::Int(42)));
        // wrong type falls back to the default
        assert_eq!(usage.items[1].value(), None);
        assert_eq!(usage.items[1].default_value(), Some(&Value::Int(0)));
    }

    #[test]
    fn resources_without_reference_match() {
        let resource = Resource::new("aws_unknown_thing.x")
            .with_usage_schema(vec![UsageItem::int("declared_only", 0)]);
        let usage = merge_resource(&resource, &reference(), None);
        assert_eq!(keys(&usage.items), vec!["declared_only"]);

        let usage = merge_resource(&Resource::new("lonely"), &reference(), None);
        assert!(usage.items.is_empty());
    }

    #[test]
    fn group_values_resolve_recursively() {
        let resource = Resource::new("module.storage.aws_s3_bucket.logs").with_usage_schema(vec![
            UsageItem::group(
                "standard",
                vec![
                    UsageItem::float("storage_gb", 0.0),
                    UsageItem::int("monthly_tier_1_requests", 0),
                ],
            ),
        ]);
        let data = existing(
            "module.storage.aws_s3_bucket.logs",
            "standard:\n  storage_gb: 12\n",
        );

        let usage = merge_resource(&resource, &ReferenceSchema::default(), Some(&data));
        let standard = usage.get("standard").expect("standard");
        assert_eq!(standard.children()[0].value(), Some(&Value::Float(12.0)));
        assert_eq!(standard.children()[1].value(), None);
    }

    #[test]
    fn wildcard_values_resolve() {
        let items = vec![UsageItem::int("disks[0].size", 0)];
        let data = existing("google_compute_instance.vm", "'disks[*].size': 50");

        let resolved = resolve_items(&items, &data);
        assert_eq!(resolved[0].value(), Some(&Value::Int(50)));
    }

    #[test]
    fn resolution_keeps_values_without_new_data() {
        let items = vec![UsageItem::int("hours", 0).with_value(10_i64)];
        let data = UsageData::new("aws_instance.web".to_string(), AttributeMap::new());

        let resolved = resolve_items(&items, &data);
        assert_eq!(resolved[0].value(), Some(&Value::Int(10)));
    }
}
