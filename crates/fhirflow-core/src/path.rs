//! Dot-notation path resolution over JSON records.
//!
//! A path is a sequence of segments separated by `.`; each segment is a bare
//! field name or a field name followed by a single `[<index>]`. Resolution is
//! fail-soft: every malformed or unmatched path yields `None`, never a panic
//! or an error. Negative indices, wildcards and multi-level indexing
//! (`a[0][1]`) are outside the grammar and resolve to `None`.

use serde_json::Value;

/// A single parsed path segment: a mapping key with an optional array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// The mapping key to index into.
    pub key: String,
    /// Array position applied after the key lookup, if any.
    pub index: Option<usize>,
}

impl Segment {
    fn bare(key: &str) -> Self {
        Self {
            key: key.to_string(),
            index: None,
        }
    }

    fn indexed(key: &str, index: usize) -> Self {
        Self {
            key: key.to_string(),
            index: Some(index),
        }
    }
}

/// Parses a path expression into segments.
///
/// Returns `None` for anything outside the supported grammar: empty paths,
/// empty segments, unbalanced brackets, non-numeric or negative indices, and
/// multi-level indexing.
pub fn parse_path(path: &str) -> Option<Vec<Segment>> {
    if path.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for raw in path.split('.') {
        segments.push(parse_segment(raw)?);
    }
    Some(segments)
}

fn parse_segment(raw: &str) -> Option<Segment> {
    if raw.is_empty() {
        return None;
    }

    match raw.find('[') {
        None => {
            if raw.contains(']') {
                return None;
            }
            Some(Segment::bare(raw))
        }
        Some(open) => {
            let key = &raw[..open];
            let rest = &raw[open + 1..];
            let close = rest.find(']')?;
            // Anything after the closing bracket means multi-level indexing.
            if key.is_empty() || !rest[close + 1..].is_empty() {
                return None;
            }
            let index: usize = rest[..close].parse().ok()?;
            Some(Segment::indexed(key, index))
        }
    }
}

/// Resolves a path expression against a record.
///
/// Walks the record segment by segment: a bare segment indexes into a mapping
/// by key; an indexed segment indexes into a mapping by key and then into the
/// resulting sequence by position. Returns `None` if a key is absent, an
/// index is out of range, an intermediate value has the wrong shape, or the
/// path itself is malformed.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    let mut current = value;
    for segment in &segments {
        current = current.as_object()?.get(&segment.key)?;
        if let Some(index) = segment.index {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// Replaces `.` and `[i]` in a path expression with `_`, producing a flat
/// output key. `"valueQuantity.value"` becomes `"valueQuantity_value"` and
/// `"code.coding[0]"` becomes `"code_coding_0"`.
pub fn sanitize_path(path: &str) -> String {
    match parse_path(path) {
        Some(segments) => segments
            .iter()
            .map(|segment| match segment.index {
                Some(index) => format!("{}_{index}", segment.key),
                None => segment.key.clone(),
            })
            .collect::<Vec<_>>()
            .join("_"),
        None => path
            .replace(['.', '['], "_")
            .replace(']', "")
            .trim_matches('_')
            .to_string(),
    }
}

/// Returns the bare key of the first path segment, used as the prefix for
/// flattened keys. `"code.coding[0]"` yields `"code"`.
pub fn prefix_key(path: &str) -> &str {
    let head = path.split('.').next().unwrap_or(path);
    match head.find('[') {
        Some(open) => &head[..open],
        None => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observation() -> Value {
        json!({
            "resourceType": "Observation",
            "id": "obs-001",
            "status": "final",
            "code": {
                "text": "Blood pressure",
                "coding": [
                    {"system": "http://loinc.org", "code": "85354-9"}
                ]
            },
            "subject": {"reference": "Patient/PT-001"},
            "component": [
                {"valueQuantity": {"value": 120, "unit": "mmHg"}},
                {"valueQuantity": {"value": 80, "unit": "mmHg"}}
            ]
        })
    }

    #[test]
    fn test_parse_bare_path() {
        let segments = parse_path("code.text").unwrap();
        assert_eq!(segments, vec![Segment::bare("code"), Segment::bare("text")]);
    }

    #[test]
    fn test_parse_indexed_path() {
        let segments = parse_path("component[0].valueQuantity.value").unwrap();
        assert_eq!(segments[0], Segment::indexed("component", 0));
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(parse_path("").is_none());
        assert!(parse_path("a..b").is_none());
        assert!(parse_path("a[").is_none());
        assert!(parse_path("a]").is_none());
        assert!(parse_path("a[x]").is_none());
        assert!(parse_path("a[-1]").is_none());
        assert!(parse_path("a[0][1]").is_none());
        assert!(parse_path("[0]").is_none());
    }

    #[test]
    fn test_resolve_top_level_field() {
        let record = observation();
        assert_eq!(resolve_path(&record, "status"), Some(&json!("final")));
    }

    #[test]
    fn test_resolve_nested_field() {
        let record = observation();
        assert_eq!(
            resolve_path(&record, "subject.reference"),
            Some(&json!("Patient/PT-001"))
        );
    }

    #[test]
    fn test_resolve_indexed_field() {
        let record = observation();
        assert_eq!(
            resolve_path(&record, "code.coding[0].code"),
            Some(&json!("85354-9"))
        );
        assert_eq!(
            resolve_path(&record, "component[1].valueQuantity.value"),
            Some(&json!(80))
        );
    }

    #[test]
    fn test_resolve_missing_key_is_not_found() {
        let record = observation();
        assert_eq!(resolve_path(&record, "valueQuantity.value"), None);
        assert_eq!(resolve_path(&record, "code.display"), None);
    }

    #[test]
    fn test_resolve_out_of_range_index_is_not_found() {
        let record = observation();
        assert_eq!(resolve_path(&record, "code.coding[5]"), None);
        assert_eq!(resolve_path(&record, "component[2].valueQuantity"), None);
    }

    #[test]
    fn test_resolve_shape_mismatch_is_not_found() {
        let record = observation();
        // status is a scalar, not a mapping
        assert_eq!(resolve_path(&record, "status.code"), None);
        // code is a mapping, not a sequence
        assert_eq!(resolve_path(&record, "code[0]"), None);
    }

    #[test]
    fn test_resolve_unsupported_grammar_is_not_found() {
        let record = observation();
        assert_eq!(resolve_path(&record, "code.coding[-1]"), None);
        assert_eq!(resolve_path(&record, "component[0][1]"), None);
        assert_eq!(resolve_path(&record, "code.coding[*]"), None);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let record = observation();
        let first = resolve_path(&record, "code.coding[0].system").cloned();
        let second = resolve_path(&record, "code.coding[0].system").cloned();
        assert_eq!(first, second);
        assert_eq!(first, Some(json!("http://loinc.org")));
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("valueQuantity.value"), "valueQuantity_value");
        assert_eq!(sanitize_path("code.coding[0]"), "code_coding_0");
        assert_eq!(sanitize_path("status"), "status");
    }

    #[test]
    fn test_prefix_key() {
        assert_eq!(prefix_key("code.coding[0]"), "code");
        assert_eq!(prefix_key("component[1].valueQuantity"), "component");
        assert_eq!(prefix_key("status"), "status");
    }
}
