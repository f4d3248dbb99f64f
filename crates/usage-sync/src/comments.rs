//! trailing line comments of block mappings
//!
//! `serde_yaml` drops comments while parsing. The reference schema stores attribute descriptions as trailing
//! comments (`key: value # description`), so we scan the source text once and index the comments by key path.
//!
//! Only block mappings are understood: one `key:` per line, nesting by indentation. Sequence items and flow
//! collections are skipped without affecting the key path.
use std::collections::HashMap;

/// Line comments by key path
#[derive(Debug, Default)]
pub(crate) struct LineComments {
    comments: HashMap<Vec<String>, String>,
}

impl LineComments {
    pub fn scan(source: &str) -> Self {
        let mut comments = HashMap::new();
        // (indentation, key) of all open mappings
        let mut stack: Vec<(usize, String)> = vec![];

        for line in source.lines() {
            let Some(entry) = KeyLine::parse(line) else {
                continue;
            };

            while stack
                .last()
                .is_some_and(|(indent, _)| *indent >= entry.indent)
            {
                stack.pop();
            }

            if let Some(comment) = entry.comment {
                let mut path: Vec<String> = stack.iter().map(|(_, key)| key.clone()).collect();
                path.push(entry.key.clone());
                tracing::trace!(?path, comment, "line comment");
                comments.insert(path, comment.to_string());
            }

            stack.push((entry.indent, entry.key));
        }

        Self { comments }
    }

    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        self.comments.get(&path).map(String::as_str)
    }
}

struct KeyLine<'a> {
    indent: usize,
    key: String,
    comment: Option<&'a str>,
}

impl<'a> KeyLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let content = line.trim_start();
        let indent = line.len() - content.len();

        if content.is_empty()
            || content.starts_with('#')
            || content.starts_with('-')
            || content.starts_with('{')
            || content.starts_with('[')
        {
            return None;
        }

        let colon = find_unquoted(content, 0, |bytes, i| {
            bytes[i] == b':' && bytes.get(i + 1).map_or(true, |next| next.is_ascii_whitespace())
        })?;

        let raw_key = content[..colon].trim();
        let key = unquote(raw_key);

        let comment = find_unquoted(content, colon + 1, |bytes, i| {
            bytes[i] == b'#' && bytes[i - 1].is_ascii_whitespace()
        })
        .map(|hash| content[hash + 1..].trim())
        .filter(|comment| !comment.is_empty());

        Some(Self {
            indent,
            key,
            comment,
        })
    }
}

/// Byte index of the first position at or after `start` that matches outside of quotes
fn find_unquoted(
    content: &str,
    start: usize,
    matches: impl Fn(&[u8], usize) -> bool,
) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() {
        let byte = bytes[i];
        match quote {
            Some(b'"') if byte == b'\\' => i += 1,
            Some(q) if byte == q => {
                // '' escapes a single quote inside single quoted scalars
                if q == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            // quotes only open a scalar at the start of a token, `it's` stays plain text
            None if (byte == b'"' || byte == b'\'')
                && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b':' | b',' | b'[' | b'{')) =>
            {
                quote = Some(byte)
            }
            None if i > 0 && matches(bytes, i) => return Some(i),
            None => {}
        }
        i += 1;
    }

    None
}

fn unquote(raw_key: &str) -> String {
    if raw_key.starts_with('"') || raw_key.starts_with('\'') {
        if let Ok(key) = serde_yaml::from_str::<String>(raw_key) {
            return key;
        }
    }
    raw_key.to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
version: 0.1 # file version
resource_usage:
  aws_s3_bucket.my_bucket:
    object_tags: 100 # Total object tags.
    standard: # Usages of S3 Standard:
      storage_gb: 10000 # Total storage in GB.
      "quoted: key": 1 # Quoted key.
    label: "value # not a comment" # Real comment.
    zones:
      - a # sequence comments are ignored
    plain: no comment here
  aws_instance.my_instance:
    operating_system: linux # Override the operating system.
"#;

    #[test]
    fn comments_by_path() {
        let comments = LineComments::scan(SOURCE);

        assert_eq!(comments.get(&["version"]), Some("file version"));
        assert_eq!(
            comments.get(&["resource_usage", "aws_s3_bucket.my_bucket", "object_tags"]),
            Some("Total object tags.")
        );
        assert_eq!(
            comments.get(&["resource_usage", "aws_s3_bucket.my_bucket", "standard"]),
            Some("Usages of S3 Standard:")
        );
        assert_eq!(
            comments.get(&[
                "resource_usage",
                "aws_s3_bucket.my_bucket",
                "standard",
                "storage_gb"
            ]),
            Some("Total storage in GB.")
        );
        assert_eq!(
            comments.get(&[
                "resource_usage",
                "aws_s3_bucket.my_bucket",
                "standard",
                "quoted: key"
            ]),
            Some("Quoted key.")
        );
        assert_eq!(
            comments.get(&["resource_usage", "aws_s3_bucket.my_bucket", "label"]),
            Some("Real comment.")
        );
        assert_eq!(
            comments.get(&["resource_usage", "aws_s3_bucket.my_bucket", "plain"]),
            None
        );
        assert_eq!(
            comments.get(&[
                "resource_usage",
                "aws_instance.my_instance",
                "operating_system"
            ]),
            Some("Override the operating system.")
        );
    }
}
