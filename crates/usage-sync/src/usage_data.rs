//! read-only typed view over one resource's attribute values
//!
//! [UsageData] wraps the attributes of a single resource, either loaded from the usage file or returned by an
//! estimator. Getters never fail: a missing key and a value of an incompatible type are both reported as `None`
//! and callers fall through to the schema default.
use crate::value::{AttributeMap, Value};
use indexmap::IndexMap;

/// Existing usage data by resource address
pub type UsageDataMap = IndexMap<String, UsageData>;

#[derive(Debug, Clone, Default, PartialEq, derive_new::new)]
pub struct UsageData {
    pub address: String,
    pub attributes: AttributeMap,
}

impl UsageData {
    /// Look up a raw value
    ///
    /// Falls back to the wildcard form of the last index when there is no exact match, so `disks[0].size`
    /// matches a value stored as `disks[*].size`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.attributes.get(key) {
            return Some(value);
        }

        let wildcard = wildcard_last_index(key)?;
        tracing::trace!(key, %wildcard, "retrying with wildcard index");
        self.attributes.get(&wildcard)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Int(int) => Some(*int),
            Value::Float(float) if float.fract() == 0.0 && float.is_finite() => {
                // saturating cast; integral floats beyond the i64 range are not meaningful usage values
                Some(*float as i64)
            }
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Int(int) => Some(*int as f64),
            Value::Float(float) => Some(*float),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Int(int) => Some(int.to_string()),
            Value::Float(float) => Some(float.to_string()),
            _ => None,
        }
    }

    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::StringList(list) => Some(list.clone()),
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    /// Nested view over a group attribute
    pub fn get_group(&self, key: &str) -> Option<UsageData> {
        let group = self.get(key)?.as_group()?;
        Some(UsageData::new(
            format!("{}.{}", self.address, key),
            group.clone(),
        ))
    }

    /// Per attribute: does it carry an actual estimate (`true`) or is it just a default (`false`)
    ///
    /// Numbers count when they are greater than zero, strings when they are not empty.
    pub fn estimation_summary(&self) -> IndexMap<String, bool> {
        self.attributes
            .iter()
            .map(|(key, value)| {
                let has_estimate = match value {
                    Value::Int(int) => *int > 0,
                    Value::Float(float) => *float > 0.0,
                    Value::String(s) => !s.is_empty(),
                    Value::StringList(_) | Value::Group(_) => false,
                };
                (key.clone(), has_estimate)
            })
            .collect()
    }
}

/// Rewrite the last `[...]` of a key into `[*]`
///
/// Returns `None` when the key has no well-formed trailing index or already uses a wildcard there.
fn wildcard_last_index(key: &str) -> Option<String> {
    let open = key.rfind('[')?;
    let close = key.rfind(']')?;
    if close < open || &key[open + 1..close] == "*" {
        return None;
    }

    Some(format!("{}*{}", &key[..=open], &key[close..]))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn usage(yaml: &str) -> UsageData {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).expect("valid yaml");
        UsageData::new(
            "aws_instance.web".to_string(),
            crate::value::attribute_map_from_yaml(mapping).expect("well formed"),
        )
    }

    #[test]
    fn wildcard_rewrite() {
        assert_eq!(
            wildcard_last_index("disks[2].size").as_deref(),
            Some("disks[*].size")
        );
        assert_eq!(
            wildcard_last_index("a[0].b[1].c").as_deref(),
            Some("a[0].b[*].c")
        );
        assert_eq!(wildcard_last_index("disks[*].size"), None);
        assert_eq!(wildcard_last_index("no_index"), None);
        assert_eq!(wildcard_last_index("odd]key["), None);
    }

    #[test]
    fn exact_match_beats_wildcard() {
        let data = usage("'disks[*].size': 10\n'disks[0].size': 20");
        assert_eq!(data.get_int("disks[0].size"), Some(20));
        assert_eq!(data.get_int("disks[1].size"), Some(10));
    }

    #[test]
    fn array_path_fallback() {
        let data = usage("'disks[*].size': 100");
        assert_eq!(data.get_int("disks[0].size"), Some(100));
        assert_eq!(data.get_float("disks[3].size"), Some(100.0));
    }

    #[test]
    fn typed_getters() {
        let data = usage(
            r#"
            hours: 730
            ratio: 0.5
            whole: 2.0
            os: linux
            numeric_text: "12"
            zones: [a, b]
            nested:
              inner: 1
            "#,
        );

        assert_eq!(data.get_int("hours"), Some(730));
        assert_eq!(data.get_float("hours"), Some(730.0));
        assert_eq!(data.get_int("ratio"), None);
        assert_eq!(data.get_int("whole"), Some(2));
        assert_eq!(data.get_int("numeric_text"), Some(12));
        assert_eq!(data.get_int("os"), None);
        assert_eq!(data.get_string("os").as_deref(), Some("linux"));
        assert_eq!(data.get_string("hours").as_deref(), Some("730"));
        assert_eq!(
            data.get_string_list("zones"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(data.get_string_list("os"), Some(vec!["linux".to_string()]));
        assert_eq!(data.get_int("nested"), None);
        assert_eq!(data.get_string("missing"), None);
    }

    #[test]
    fn nested_group_view() {
        let data = usage("standard:\n  storage_gb: 10");
        let group = data.get_group("standard").expect("group");
        assert_eq!(group.address, "aws_instance.web.standard");
        assert_eq!(group.get_int("storage_gb"), Some(10));
        assert!(data.get_group("missing").is_none());
    }

    #[test]
    fn estimation_summary() {
        let data = usage("a: 0\nb: 3\nc: ''\nd: text\ne: 0.0\nf: [x]");
        let summary = data.estimation_summary();
        assert_eq!(
            summary.into_iter().collect::<Vec<_>>(),
            vec![
                ("a".to_string(), false),
                ("b".to_string(), true),
                ("c".to_string(), false),
                ("d".to_string(), true),
                ("e".to_string(), false),
                ("f".to_string(), false),
            ]
        );
    }
}
