// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing and formatting of operation resource names.
//!
//! Accepts relative names (`projects/p/locations/l/operations/o`) as well as
//! full API URLs (`https://compute.googleapis.com/compute/v1/projects/...`),
//! which are reduced to their relative form.

use crate::error::{LroError, Result};
use std::fmt;
use std::str::FromStr;

/// Where inside a project an operation lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationScope {
    /// `projects/{p}/global/operations/{o}`
    Global,
    /// `projects/{p}/locations/{l}/operations/{o}`
    Location(String),
    /// `projects/{p}/regions/{r}/operations/{o}`
    Region(String),
    /// `projects/{p}/zones/{z}/operations/{o}`
    Zone(String),
}

impl OperationScope {
    /// The location, region or zone name; `None` for global operations.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            OperationScope::Global => None,
            OperationScope::Location(l) | OperationScope::Region(l) | OperationScope::Zone(l) => {
                Some(l)
            }
        }
    }
}

/// A parsed operation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationName {
    project: Option<String>,
    scope: Option<OperationScope>,
    id: String,
}

impl OperationName {
    /// Parse a relative name or full URL.
    ///
    /// # Errors
    ///
    /// Returns [`LroError::Validation`] when the input does not match any of
    /// the known operation name layouts.
    #[allow(clippy::result_large_err)]
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let path = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            let url = url::Url::parse(trimmed)
                .map_err(|e| invalid(input, &format!("not a valid URL: {e}")))?;
            url.path().to_string()
        } else {
            trimmed.to_string()
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let start = segments
            .iter()
            .position(|s| *s == "projects")
            .or_else(|| segments.iter().position(|s| *s == "operations"))
            .ok_or_else(|| invalid(input, "expected a projects/ or operations/ path"))?;

        Self::from_segments(&segments[start..]).ok_or_else(|| invalid(input, "unknown layout"))
    }

    fn from_segments(segments: &[&str]) -> Option<Self> {
        let name = match segments {
            ["projects", p, "locations", l, "operations", o @ ..] => Self {
                project: Some((*p).to_string()),
                scope: Some(OperationScope::Location((*l).to_string())),
                id: join_id(o)?,
            },
            ["projects", p, "regions", r, "operations", o @ ..] => Self {
                project: Some((*p).to_string()),
                scope: Some(OperationScope::Region((*r).to_string())),
                id: join_id(o)?,
            },
            ["projects", p, "zones", z, "operations", o @ ..] => Self {
                project: Some((*p).to_string()),
                scope: Some(OperationScope::Zone((*z).to_string())),
                id: join_id(o)?,
            },
            ["projects", p, "global", "operations", o @ ..] => Self {
                project: Some((*p).to_string()),
                scope: Some(OperationScope::Global),
                id: join_id(o)?,
            },
            ["projects", p, "operations", o @ ..] => Self {
                project: Some((*p).to_string()),
                scope: None,
                id: join_id(o)?,
            },
            ["operations", o @ ..] => Self {
                project: None,
                scope: None,
                id: join_id(o)?,
            },
            _ => return None,
        };
        Some(name)
    }

    /// Build a name for an operation under a location.
    #[must_use]
    pub fn in_location(
        project: impl Into<String>,
        location: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            project: Some(project.into()),
            scope: Some(OperationScope::Location(location.into())),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    #[must_use]
    pub fn scope(&self) -> Option<&OperationScope> {
        self.scope.as_ref()
    }

    /// The trailing operation identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The canonical relative name, as sent in status requests.
    #[must_use]
    pub fn relative_name(&self) -> String {
        let mut out = String::new();
        if let Some(project) = &self.project {
            out.push_str("projects/");
            out.push_str(project);
            out.push('/');
            match &self.scope {
                Some(OperationScope::Global) => out.push_str("global/"),
                Some(OperationScope::Location(l)) => {
                    out.push_str("locations/");
                    out.push_str(l);
                    out.push('/');
                }
                Some(OperationScope::Region(r)) => {
                    out.push_str("regions/");
                    out.push_str(r);
                    out.push('/');
                }
                Some(OperationScope::Zone(z)) => {
                    out.push_str("zones/");
                    out.push_str(z);
                    out.push('/');
                }
                None => {}
            }
        }
        out.push_str("operations/");
        out.push_str(&self.id);
        out
    }
}

fn join_id(rest: &[&str]) -> Option<String> {
    if rest.is_empty() {
        None
    } else {
        Some(rest.join("/"))
    }
}

fn invalid(input: &str, reason: &str) -> LroError {
    LroError::Validation(format!("Invalid operation name [{input}]: {reason}"))
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_name())
    }
}

impl FromStr for OperationName {
    type Err = LroError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_operation() {
        let name =
            OperationName::parse("projects/my-proj/locations/us-central1/operations/op-123")
                .unwrap();
        assert_eq!(name.project(), Some("my-proj"));
        assert_eq!(
            name.scope(),
            Some(&OperationScope::Location("us-central1".to_string()))
        );
        assert_eq!(name.id(), "op-123");
        assert_eq!(
            name.to_string(),
            "projects/my-proj/locations/us-central1/operations/op-123"
        );
    }

    #[test]
    fn test_parse_compute_url() {
        let name = OperationName::parse(
            "https://compute.googleapis.com/compute/v1/projects/p/zones/us-east1-b/operations/operation-17",
        )
        .unwrap();
        assert_eq!(name.scope().and_then(OperationScope::location), Some("us-east1-b"));
        assert_eq!(
            name.relative_name(),
            "projects/p/zones/us-east1-b/operations/operation-17"
        );
    }

    #[test]
    fn test_parse_global_and_region() {
        let global: OperationName = "projects/p/global/operations/g1".parse().unwrap();
        assert_eq!(global.scope(), Some(&OperationScope::Global));
        assert_eq!(global.to_string(), "projects/p/global/operations/g1");

        let regional: OperationName = "projects/p/regions/europe-west1/operations/r1"
            .parse()
            .unwrap();
        assert_eq!(
            regional.scope(),
            Some(&OperationScope::Region("europe-west1".to_string()))
        );
    }

    #[test]
    fn test_parse_bare_operation_keeps_nested_id() {
        let name = OperationName::parse("operations/cp.7731/step-2").unwrap();
        assert_eq!(name.project(), None);
        assert_eq!(name.id(), "cp.7731/step-2");
        assert_eq!(name.to_string(), "operations/cp.7731/step-2");
    }

    #[test]
    fn test_parse_project_level_operation() {
        let name = OperationName::parse("/v1/projects/p/operations/abc").unwrap();
        assert_eq!(name.project(), Some("p"));
        assert!(name.scope().is_none());
        assert_eq!(name.to_string(), "projects/p/operations/abc");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            OperationName::parse("buckets/b/objects/o"),
            Err(LroError::Validation(_))
        ));
        assert!(OperationName::parse("projects/p/locations/l/operations").is_err());
        assert!(OperationName::parse("projects/p/instances/i").is_err());
    }

    #[test]
    fn test_in_location_builder() {
        let name = OperationName::in_location("p", "asia-east1", "op");
        assert_eq!(name.to_string(), "projects/p/locations/asia-east1/operations/op");
    }
}
