//! Pure path-based updates into nested JSON values.
//!
//! Admin forms address fields inside a section payload with dotted paths
//! like `hero.title` or `items[2].quote`. [`set_value`] produces a new tree
//! with the addressed leaf replaced and everything else untouched; the
//! input is never mutated, which is what keeps draft snapshots cheap to
//! reason about.

use serde_json::{Map, Value};
use thiserror::Error;

/// Largest array index a path may address. [`set_value`] null-pads arrays
/// up to the addressed index, so paths arrive bounded; field names are
/// attacker-supplied on multipart submits.
pub const MAX_INDEX: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),
    #[error("index `{0}` exceeds the maximum of {MAX_INDEX}")]
    IndexOutOfRange(String),
}

fn push_segment(segments: &mut Vec<String>, segment: &str, path: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    if let Ok(index) = segment.parse::<usize>() {
        if index > MAX_INDEX {
            return Err(PathError::IndexOutOfRange(segment.to_string()));
        }
    }
    segments.push(segment.to_string());
    Ok(())
}

/// Split a dotted/bracket-indexed path into segments.
///
/// `items[2].title` and `items.2.title` both yield `["items", "2", "title"]`.
/// Whether a segment addresses an array index or an object key is decided
/// at application time, not at parse time, but numeric segments beyond
/// [`MAX_INDEX`] are rejected here.
pub fn parse_path(path: &str) -> Result<Vec<String>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let mut segments = Vec::new();
    for piece in path.split('.') {
        if piece.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        let mut rest = piece;
        if let Some(bracket) = rest.find('[') {
            push_segment(&mut segments, &rest[..bracket], path)?;
            rest = &rest[bracket..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    return Err(PathError::EmptySegment(path.to_string()));
                };
                push_segment(&mut segments, &stripped[..close], path)?;
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return Err(PathError::EmptySegment(path.to_string()));
            }
        } else {
            push_segment(&mut segments, rest, path)?;
        }
    }

    Ok(segments)
}

/// Return a copy of `root` with the leaf at `path` replaced by `leaf`.
///
/// Containers along the path are cloned; an exhausted path returns the leaf
/// itself, so replacing a sub-object with a plain string is allowed. A
/// numeric segment always addresses an array slot: if the existing value at
/// that position is not an array (including an object keyed by numeric
/// strings), it is coerced to a fresh array. That coercion is intentional —
/// several forms rely on numeric-keyed objects normalizing to arrays.
pub fn set_value(root: &Value, path: &[String], leaf: Value) -> Value {
    let Some((segment, rest)) = path.split_first() else {
        return leaf;
    };

    if let Ok(index) = segment.parse::<usize>() {
        let mut items = match root {
            Value::Array(items) => items.clone(),
            _ => Vec::new(),
        };
        while items.len() <= index {
            items.push(Value::Null);
        }
        items[index] = set_value(&items[index], rest, leaf);
        Value::Array(items)
    } else {
        let mut fields = match root {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        let child = set_value(fields.get(segment).unwrap_or(&Value::Null), rest, leaf);
        fields.insert(segment.clone(), child);
        Value::Object(fields)
    }
}

/// Read the value at `path`, if the whole path resolves.
pub fn get_value<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = if let Ok(index) = segment.parse::<usize>() {
            current.as_array()?.get(index)?
        } else {
            current.as_object()?.get(segment)?
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(p: &str) -> Vec<String> {
        parse_path(p).unwrap()
    }

    #[test]
    fn test_parse_dotted_path() {
        assert_eq!(path("hero.image.src"), vec!["hero", "image", "src"]);
    }

    #[test]
    fn test_parse_bracket_path() {
        assert_eq!(path("items[2].title"), vec!["items", "2", "title"]);
        assert_eq!(path("grid[0][1]"), vec!["grid", "0", "1"]);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(parse_path(""), Err(PathError::Empty));
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("items[]").is_err());
        assert!(parse_path("items[1").is_err());
    }

    #[test]
    fn test_parse_rejects_absurd_indices() {
        // a hostile field name must not be able to demand gigabytes of
        // null padding
        assert_eq!(
            parse_path("items.999999999999"),
            Err(PathError::IndexOutOfRange("999999999999".to_string()))
        );
        assert_eq!(
            parse_path("items[999999999999]"),
            Err(PathError::IndexOutOfRange("999999999999".to_string()))
        );
        assert!(parse_path(&format!("items.{MAX_INDEX}")).is_ok());
    }

    #[test]
    fn test_set_nested_key() {
        let root = json!({"a": {"b": "x"}});
        let updated = set_value(&root, &path("a.b"), json!("y"));
        assert_eq!(updated, json!({"a": {"b": "y"}}));
    }

    #[test]
    fn test_set_array_element_field() {
        let root = json!({"items": [{"t": "1"}]});
        let updated = set_value(&root, &path("items.0.t"), json!("2"));
        assert_eq!(updated, json!({"items": [{"t": "2"}]}));
        // original untouched
        assert_eq!(root, json!({"items": [{"t": "1"}]}));
    }

    #[test]
    fn test_input_is_never_mutated() {
        let root = json!({"hero": {"title": "Hi", "image": {"src": "a.png"}}});
        let before = root.clone();
        let updated = set_value(&root, &path("hero.image.src"), json!("b.png"));
        assert_eq!(root, before);
        assert_eq!(
            get_value(&updated, &path("hero.image.src")),
            Some(&json!("b.png"))
        );
    }

    #[test]
    fn test_siblings_preserved_off_path() {
        let root = json!({
            "hero": {"title": "Hi", "subtitle": "There"},
            "footer": {"text": "Bye"}
        });
        let updated = set_value(&root, &path("hero.title"), json!("Hello"));
        assert_eq!(updated["hero"]["subtitle"], root["hero"]["subtitle"]);
        assert_eq!(updated["footer"], root["footer"]);
        assert_eq!(updated["hero"]["title"], json!("Hello"));
    }

    #[test]
    fn test_missing_intermediates_created() {
        let root = json!({});
        let updated = set_value(&root, &path("a.b.c"), json!(1));
        assert_eq!(updated, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_numeric_segment_creates_array() {
        let root = json!({});
        let updated = set_value(&root, &path("items.2"), json!("x"));
        assert_eq!(updated, json!({"items": [null, null, "x"]}));
    }

    #[test]
    fn test_numeric_segment_coerces_object_to_array() {
        // Numeric-keyed objects normalize to arrays; prior keys are dropped.
        let root = json!({"items": {"0": "a", "1": "b"}});
        let updated = set_value(&root, &path("items.0"), json!("c"));
        assert_eq!(updated, json!({"items": ["c"]}));
    }

    #[test]
    fn test_leaf_type_change_allowed() {
        let root = json!({"hero": {"image": {"src": "a.png", "alt": "x"}}});
        let updated = set_value(&root, &path("hero.image"), json!("plain.png"));
        assert_eq!(updated, json!({"hero": {"image": "plain.png"}}));
    }

    #[test]
    fn test_existing_array_elements_kept() {
        let root = json!({"items": ["a", "b", "c"]});
        let updated = set_value(&root, &path("items.1"), json!("B"));
        assert_eq!(updated, json!({"items": ["a", "B", "c"]}));
    }

    #[test]
    fn test_get_value() {
        let root = json!({"items": [{"t": "1"}]});
        assert_eq!(get_value(&root, &path("items.0.t")), Some(&json!("1")));
        assert_eq!(get_value(&root, &path("items.1.t")), None);
        assert_eq!(get_value(&root, &path("missing")), None);
    }
}
