//! Path templates with `{placeholder}` segments.

use std::fmt;

use percent_encoding::percent_decode_str;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

/// A compiled path template such as `/api/pets/{id}`.
///
/// Each placeholder matches one or more characters inside a single segment,
/// lazily, so `/files/{name}.{ext}` splits `a.b.c` as `a` / `b.c`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    raw: String,
    names: Vec<String>,
    matcher: Regex,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, DefinitionError> {
        let invalid = || DefinitionError::InvalidPathTemplate(template.to_string());

        let mut pattern = String::with_capacity(template.len() + 8);
        let mut names = Vec::new();
        let mut rest = template;

        pattern.push('^');
        while let Some(open) = rest.find(['{', '}']) {
            if rest.as_bytes()[open] == b'}' {
                return Err(invalid());
            }
            pattern.push_str(&regex_lite::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(invalid)?;
            let name = &after[..close];
            if name.is_empty() || name.contains(['{', '/']) {
                return Err(invalid());
            }
            names.push(name.to_string());
            pattern.push_str("([^/]+?)");
            rest = &after[close + 1..];
        }
        pattern.push_str(&regex_lite::escape(rest));
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|_| invalid())?;
        Ok(Self {
            raw: template.to_string(),
            names,
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in declaration order.
    pub fn variables(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, path: &str) -> bool {
        self.raw == path || self.matcher.is_match(path)
    }

    /// Extract placeholder values from a concrete path.
    ///
    /// Values are percent-decoded. Returns `None` when the path does not fit.
    pub fn extract(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.matcher.captures(path)?;
        Some(
            self.names
                .iter()
                .zip(captures.iter().skip(1))
                .map(|(name, value)| {
                    let value = value.map(|m| m.as_str()).unwrap_or_default();
                    (
                        name.clone(),
                        percent_decode_str(value).decode_utf8_lossy().into_owned(),
                    )
                })
                .collect(),
        )
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathTemplate").field(&self.raw).finish()
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathTemplate {}

impl TryFrom<String> for PathTemplate {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PathTemplate> for String {
    fn from(template: PathTemplate) -> Self {
        template.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(template: &str, path: &str) -> Option<Vec<(String, String)>> {
        PathTemplate::parse(template).unwrap().extract(path)
    }

    #[test]
    fn static_template_matches_exactly() {
        let template = PathTemplate::parse("/api/pets").unwrap();
        assert!(template.matches("/api/pets"));
        assert!(!template.matches("/api/pets/1"));
        assert!(!template.matches("/api"));
        assert_eq!(template.extract("/api/pets"), Some(vec![]));
    }

    #[test]
    fn placeholder_captures_one_segment() {
        assert_eq!(
            extract("/pets/{id}", "/pets/42"),
            Some(vec![("id".into(), "42".into())])
        );
        assert_eq!(extract("/pets/{id}", "/pets/42/toys"), None);
        assert_eq!(extract("/pets/{id}", "/pets/"), None);
    }

    #[test]
    fn multiple_placeholders() {
        assert_eq!(
            extract("/users/{user}/orders/{order}", "/users/u1/orders/o%202"),
            Some(vec![
                ("user".into(), "u1".into()),
                ("order".into(), "o 2".into())
            ])
        );
    }

    #[test]
    fn placeholder_inside_segment_is_lazy() {
        assert_eq!(
            extract("/files/{name}.{ext}", "/files/report.tar.gz"),
            Some(vec![
                ("name".into(), "report".into()),
                ("ext".into(), "tar.gz".into())
            ])
        );
    }

    #[test]
    fn literal_regex_characters_are_escaped() {
        let template = PathTemplate::parse("/v1.0/items+list").unwrap();
        assert!(template.matches("/v1.0/items+list"));
        assert!(!template.matches("/v1x0/items+list"));
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for raw in ["/pets/{id", "/pets/id}", "/pets/{}", "/pets/{a{b}"] {
            assert_eq!(
                PathTemplate::parse(raw).unwrap_err(),
                DefinitionError::InvalidPathTemplate(raw.into()),
                "{raw}"
            );
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let template = PathTemplate::parse("/pets/{id}").unwrap();
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, "\"/pets/{id}\"");

        let back: PathTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
        assert!(back.matches("/pets/7"));
    }
}
