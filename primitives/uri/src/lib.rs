#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! URI template utilities.
//!
//! Resource paths are assembled from class-level and method-level templates;
//! these helpers join fragments, collapse duplicate slashes and normalize
//! leading/trailing separators so that equal logical paths compare equal.

/// Join two URI template fragments with a single separator.
///
/// Either side may be empty, carry leading/trailing slashes or contain
/// template variables; duplicate slashes in the result are collapsed.
///
/// ```
/// use restscan_uri::join;
/// assert_eq!(join("users", "{id}"), "users/{id}");
/// assert_eq!(join("/users/", "/{id}/"), "users/{id}");
/// assert_eq!(join("", "users"), "users");
/// assert_eq!(join("users", ""), "users");
/// ```
pub fn join(base: &str, sub: &str) -> String {
    normalize(&format!("{}/{}", base, sub))
}

/// Collapse duplicate slashes and strip leading/trailing separators.
///
/// ```
/// use restscan_uri::normalize;
/// assert_eq!(normalize("//a///b/"), "a/b");
/// assert_eq!(normalize("/"), "");
/// ```
pub fn normalize(template: &str) -> String {
    template.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

/// Template variable names (`{name}` segments, regex suffixes stripped).
///
/// ```
/// use restscan_uri::template_variables;
/// assert_eq!(template_variables("users/{id}/files/{name: .+}"), vec!["id", "name"]);
/// ```
pub fn template_variables(template: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else { break };
        let inner = &rest[open + 1..open + close];
        let name = inner.split(':').next().unwrap_or(inner).trim();
        if !name.is_empty() {
            vars.push(name.to_string());
        }
        rest = &rest[open + close + 1..];
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_collapses_duplicate_slashes() {
        assert_eq!(join("/users/", "//{id}"), "users/{id}");
        assert_eq!(join("a/b", "c/d"), "a/b/c/d");
    }

    #[test]
    fn normalize_empty_forms() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "");
    }

    #[test]
    fn variables_with_regex_suffix() {
        assert_eq!(template_variables("{id: \\d+}"), vec!["id"]);
        assert!(template_variables("plain/path").is_empty());
    }
}
