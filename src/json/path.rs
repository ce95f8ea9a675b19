//! Path Resolver
//!
//! Resolves dotted paths (`data.rates.USD`, `items.0.price`) against a
//! document. Absence is a normal outcome and is reported as `None`.

use serde_json::Value;

/// Resolve `path` against `document`
///
/// Each `.`-separated segment is a property lookup on an object, or an index
/// lookup on an array when the segment is a plain decimal number. Returns
/// `None` as soon as an intermediate value is `null` or is not a container,
/// or a key/index is missing. The final value may itself be `null`, an
/// object, or an array.
pub fn resolve<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|idx| items.get(idx)),
        _ => None,
    })
}

/// Resolve against an optional document (a widget that has not fetched yet)
pub fn resolve_opt<'a>(document: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    document.and_then(|doc| resolve(doc, path))
}

fn parse_index(segment: &str) -> Option<usize> {
    // Only canonical decimal indices: "01" and "+1" are property names
    if segment.is_empty()
        || !segment.bytes().all(|b| b.is_ascii_digit())
        || (segment.len() > 1 && segment.starts_with('0'))
    {
        return None;
    }
    segment.parse().ok()
}
