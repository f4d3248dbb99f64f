use super::{Entry, Node};

/// Write block style yaml
///
/// Entries flagged as commented are written with every line (including nested ones) prefixed by `# `, placed
/// after the indentation so uncommenting keeps the structure intact.
pub(crate) fn emit(entries: &[Entry]) -> String {
    let mut out = String::new();
    write_entries(&mut out, entries, 0, false);
    out
}

fn write_entries(out: &mut String, entries: &[Entry], indent: usize, commented: bool) {
    for entry in entries {
        let commented = commented || entry.commented;
        let key = string(&entry.key);
        let comment = entry.comment.as_deref();

        match &entry.value {
            Node::Scalar(scalar) => {
                write_line(out, indent, commented, &format!("{key}: {scalar}"), comment)
            }
            Node::Sequence(elements) if elements.is_empty() => {
                write_line(out, indent, commented, &format!("{key}: []"), comment)
            }
            Node::Sequence(elements) => {
                write_line(out, indent, commented, &format!("{key}:"), comment);
                for element in elements {
                    write_line(out, indent + 2, commented, &format!("- {element}"), None);
                }
            }
            Node::Mapping(children) if children.is_empty() => {
                write_line(out, indent, commented, &format!("{key}: {{}}"), comment)
            }
            Node::Mapping(children) => {
                write_line(out, indent, commented, &format!("{key}:"), comment);
                write_entries(out, children, indent + 2, commented);
            }
        }
    }
}

fn write_line(out: &mut String, indent: usize, commented: bool, content: &str, comment: Option<&str>) {
    out.extend(std::iter::repeat(' ').take(indent));
    if commented {
        out.push_str("# ");
    }
    out.push_str(content);
    if let Some(comment) = comment {
        out.push_str(" # ");
        out.push_str(comment);
    }
    out.push('\n');
}

/// String scalar, plain when yaml reads it back as the same string, double quoted otherwise
pub(crate) fn string(s: &str) -> String {
    let plain = match serde_yaml::to_string(s) {
        Ok(rendered) => rendered.trim_end_matches('\n') == s,
        Err(_) => false,
    };

    if plain {
        s.to_string()
    } else {
        double_quoted(s)
    }
}

/// json strings are valid double quoted yaml scalars
pub(crate) fn double_quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Fixed-point float scalar that always reads back as a float
pub(crate) fn float(f: f64) -> String {
    if f.is_nan() {
        return ".nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }

    let mut rendered = f.to_string();
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered
}

/// Comments have to stay on one line
pub(crate) fn comment(description: &str) -> Option<String> {
    let single_line = description.replace(['\r', '\n'], " ");
    let trimmed = single_line.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
