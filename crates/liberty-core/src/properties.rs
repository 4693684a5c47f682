//! `${property}` substitution in coordinates.

use liberty_schema::Coordinate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::SubstitutionError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Replace every `${name}` in `value` with its entry in `table`.
///
/// Substitution is a single pass: a replacement value that itself contains
/// `${...}` is inserted literally. `${env.NAME}` falls back to the process
/// environment when the table has no such key.
pub fn substitute(value: &str, table: &BTreeMap<String, String>) -> Result<String, SubstitutionError> {
    if !value.contains("${") {
        return Ok(value.to_string());
    }

    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(value) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str().trim();
        let replacement = table
            .get(name)
            .cloned()
            .or_else(|| name.strip_prefix("env.").and_then(|var| std::env::var(var).ok()))
            .ok_or_else(|| SubstitutionError {
                property: name.to_string(),
                value: value.to_string(),
            })?;

        out.push_str(&value[last..whole.start()]);
        out.push_str(&replacement);
        last = whole.end();
    }
    out.push_str(&value[last..]);
    Ok(out)
}

/// Substitute group, artifact and version of a coordinate.
///
/// The packaging type is taken as-is.
pub fn substitute_coordinate(
    coordinate: &Coordinate,
    table: &BTreeMap<String, String>,
) -> Result<Coordinate, SubstitutionError> {
    Ok(Coordinate {
        group_id: substitute(&coordinate.group_id, table)?,
        artifact_id: substitute(&coordinate.artifact_id, table)?,
        kind: coordinate.kind.clone(),
        version: substitute(&coordinate.version, table)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("liberty.version".to_string(), "24.0.0.1".to_string()),
            ("group".to_string(), "com.example".to_string()),
            ("nested".to_string(), "${group}".to_string()),
        ])
    }

    #[test]
    fn test_no_placeholder_is_identity() {
        assert_eq!(substitute("1.0", &table()).unwrap(), "1.0");
        let c = Coordinate::new("com.example", "x", "esa", "1.0");
        assert_eq!(substitute_coordinate(&c, &table()).unwrap(), c);
    }

    #[test]
    fn test_single_placeholder() {
        assert_eq!(
            substitute("v${liberty.version}-final", &table()).unwrap(),
            "v24.0.0.1-final"
        );
    }

    #[test]
    fn test_substitutes_exactly_once() {
        assert_eq!(substitute("${nested}", &table()).unwrap(), "${group}");
    }

    #[test]
    fn test_multiple_placeholders() {
        assert_eq!(
            substitute("${group}:${liberty.version}", &table()).unwrap(),
            "com.example:24.0.0.1"
        );
    }

    #[test]
    fn test_unresolved_placeholder_fails() {
        let err = substitute("${missing.prop}", &table()).unwrap_err();
        assert_eq!(err.property, "missing.prop");
        assert_eq!(err.to_string(), "Unresolved property '${missing.prop}' in '${missing.prop}'");
    }

    #[test]
    fn test_coordinate_substitution_keeps_type() {
        let c = Coordinate::new("${group}", "features", "${kind}", "${liberty.version}");
        let resolved = substitute_coordinate(&c, &table()).unwrap();
        assert_eq!(resolved.group_id, "com.example");
        assert_eq!(resolved.kind, "${kind}");
        assert_eq!(resolved.version, "24.0.0.1");
    }
}
