//! projection of resolved usage trees into a usage file
//!
//! Resources and attributes are written in merge order. Attributes without a concrete value are still written,
//! with their default, but commented out: the file documents every available knob while reading it back only
//! yields what was actually set. The same applies one level up: a resource without any value is commented out
//! as a whole, and so is `resource_usage` when no resource has a value.
mod emitter;

use crate::schema::{ResourceUsage, UsageItem, UsageSlot};
use crate::value::Value;

/// Render a complete usage file
pub fn usage_document(version: &str, resources: &[ResourceUsage]) -> String {
    let resources: Vec<Entry> = resources
        .iter()
        .filter(|resource| !resource.items.is_empty())
        .map(resource_entry)
        .collect();
    let has_usage = resources.iter().any(|entry| !entry.commented);

    let mut resource_usage = Entry::new(
        "resource_usage".to_string(),
        Node::Mapping(resources),
    );
    resource_usage.commented = !has_usage && !resource_usage.value.is_empty();

    let root = [
        Entry::new(
            "version".to_string(),
            Node::Scalar(emitter::double_quoted(version)),
        ),
        resource_usage,
    ];

    emitter::emit(&root)
}

fn resource_entry(resource: &ResourceUsage) -> Entry {
    let mut entry = Entry::new(
        resource.key.clone(),
        Node::Mapping(resource.items.iter().map(item_entry).collect()),
    );
    entry.commented = !resource.has_usage();
    entry
}

fn item_entry(item: &UsageItem) -> Entry {
    let (value, commented) = match &item.slot {
        UsageSlot::Leaf {
            default_value,
            value,
        } => (
            value_node(value.as_ref().unwrap_or(default_value)),
            value.is_none(),
        ),
        UsageSlot::Group(children) => (
            Node::Mapping(children.iter().map(item_entry).collect()),
            !item.is_set(),
        ),
    };

    Entry {
        key: item.key.clone(),
        value,
        comment: emitter::comment(&item.description),
        commented,
    }
}

fn value_node(value: &Value) -> Node {
    match value {
        Value::Int(int) => Node::Scalar(int.to_string()),
        Value::Float(float) => Node::Scalar(emitter::float(*float)),
        Value::String(s) => Node::Scalar(emitter::string(s)),
        Value::StringList(list) => Node::Sequence(list.iter().map(|s| emitter::string(s)).collect()),
        Value::Group(group) => Node::Mapping(
            group
                .iter()
                .map(|(key, value)| Entry::new(key.clone(), value_node(value)))
                .collect(),
        ),
    }
}

/// Document tree handed to the emitter, scalars are already rendered
#[derive(Debug)]
pub(crate) enum Node {
    Scalar(String),
    Sequence(Vec<String>),
    Mapping(Vec<Entry>),
}

impl Node {
    fn is_empty(&self) -> bool {
        match self {
            Node::Scalar(_) => false,
            Node::Sequence(elements) => elements.is_empty(),
            Node::Mapping(entries) => entries.is_empty(),
        }
    }
}

#[derive(Debug, derive_new::new)]
pub(crate) struct Entry {
    key: String,
    value: Node,
    /// trailing comment on the value
    #[new(default)]
    comment: Option<String>,
    #[new(default)]
    commented: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::UsageItem;

    fn resources() -> Vec<ResourceUsage> {
        vec![
            ResourceUsage::new(
                "aws_instance.web".to_string(),
                vec![
                    UsageItem::string("operating_system", "linux")
                        .with_description("Override the operating system.")
                        .with_value("windows"),
                    UsageItem::int("monthly_cpu_credit_hrs", 0).with_description("Burst hours."),
                ],
            ),
            ResourceUsage::new(
                "aws_s3_bucket.logs".to_string(),
                vec![
                    UsageItem::int("object_tags", 0),
                    UsageItem::group(
                        "standard",
                        vec![
                            UsageItem::float("storage_gb", 0.0)
                                .with_description("Total storage in GB.")
                                .with_value(2.5),
                            UsageItem::int("monthly_tier_1_requests", 0),
                        ],
                    )
                    .with_description("Usages of S3 Standard:"),
                    UsageItem::group("glacier", vec![UsageItem::float("storage_gb", 0.0)]),
                ],
            ),
            ResourceUsage::new(
                "aws_lambda_function.api".to_string(),
                vec![UsageItem::int("monthly_requests", 0).with_description("Monthly requests.")],
            ),
            ResourceUsage::new("aws_vpc.main".to_string(), vec![]),
            ResourceUsage::new(
                "aws_eks_node_group.workers".to_string(),
                vec![
                    UsageItem::string_list("availability_zones", vec![])
                        .with_value(vec!["us-east-1a".to_string(), "us-east-1b".to_string()]),
                    UsageItem::int("instances", 0).with_value(3_i64),
                ],
            ),
        ]
    }

    #[test]
    fn usage_document() {
        let rendered = super::usage_document("0.1", &resources());

        insta::assert_snapshot!(rendered.trim_end(), @r###"
        version: "0.1"
        resource_usage:
          aws_instance.web:
            operating_system: windows # Override the operating system.
            # monthly_cpu_credit_hrs: 0 # Burst hours.
          aws_s3_bucket.logs:
            # object_tags: 0
            standard: # Usages of S3 Standard:
              storage_gb: 2.5 # Total storage in GB.
              # monthly_tier_1_requests: 0
            # glacier:
              # storage_gb: 0.0
          # aws_lambda_function.api:
            # monthly_requests: 0 # Monthly requests.
          aws_eks_node_group.workers:
            availability_zones:
              - us-east-1a
              - us-east-1b
            instances: 3
        "###);
    }

    #[test]
    fn resource_usage_commented_without_any_value() {
        let resources = vec![ResourceUsage::new(
            "aws_lambda_function.api".to_string(),
            vec![UsageItem::int("monthly_requests", 0)],
        )];

        insta::assert_snapshot!(super::usage_document("0.1", &resources).trim_end(), @r###"
        version: "0.1"
        # resource_usage:
          # aws_lambda_function.api:
            # monthly_requests: 0
        "###);
    }

    #[test]
    fn empty_document() {
        pretty_assertions::assert_eq!(
            super::usage_document("0.1", &[]),
            "version: \"0.1\"\nresource_usage: {}\n"
        );
    }

    #[test]
    fn output_parses_back_without_unset_values() {
        let rendered = super::usage_document("0.1", &resources());
        let parsed: serde_yaml::Value = serde_yaml::from_str(&rendered).expect("valid yaml");

        let web = &parsed["resource_usage"]["aws_instance.web"];
        assert_eq!(web["operating_system"].as_str(), Some("windows"));
        assert!(web.get("monthly_cpu_credit_hrs").is_none());

        let logs = &parsed["resource_usage"]["aws_s3_bucket.logs"];
        assert_eq!(logs["standard"]["storage_gb"].as_f64(), Some(2.5));
        assert!(logs.get("glacier").is_none());

        assert!(parsed["resource_usage"].get("aws_lambda_function.api").is_none());
    }
}
