//! Hierarchical resource identifiers
//!
//! A Nimbus resource identifier is a path of key/value pairs:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{group}/providers/{ns}/{type}/{name}[/{childType}/{childName}]...
//! ```
//!
//! Identifiers are parsed once and immutable afterwards. Segment *keys*
//! (`subscriptions`, `resourceGroups`, collection names) are documented by the
//! remote system as case-insensitive and are matched accordingly; segment
//! *values* are preserved exactly and never normalized, since the remote side
//! is case-sensitive about the names it stores.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// One `{key}/{value}` pair of an identifier path.
#[derive(Debug, Clone)]
pub struct Segment {
    pub key: String,
    pub value: String,
}

/// A parsed, immutable resource identifier. Always constructed through
/// [`ResourceIdentifier::parse`]; serialized forms travel as plain strings.
#[derive(Debug, Clone)]
pub struct ResourceIdentifier {
    raw: String,
    segments: Vec<Segment>,
}

impl ResourceIdentifier {
    /// Parse a raw identifier string.
    ///
    /// Fails with [`Error::InvalidIdentifier`] when the path is not a
    /// non-empty sequence of key/value pairs rooted at `subscriptions`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidIdentifier {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("path contains an empty segment"));
        }
        if parts.len() % 2 != 0 {
            return Err(invalid("path must be key/value pairs"));
        }

        let segments: Vec<Segment> = parts
            .chunks(2)
            .map(|pair| Segment {
                key: pair[0].to_string(),
                value: pair[1].to_string(),
            })
            .collect();

        if !segments[0].key.eq_ignore_ascii_case("subscriptions") {
            return Err(invalid("path must be rooted at /subscriptions"));
        }

        Ok(Self::from_segments(segments))
    }

    fn from_segments(segments: Vec<Segment>) -> Self {
        let mut raw = String::new();
        for seg in &segments {
            raw.push('/');
            raw.push_str(&seg.key);
            raw.push('/');
            raw.push_str(&seg.value);
        }
        Self { raw, segments }
    }

    /// The identifier exactly as it is sent to the remote system.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn subscription(&self) -> &str {
        &self.segments[0].value
    }

    /// Value of the first segment whose key matches, case-insensitively.
    pub fn segment_value(&self, key: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.key.eq_ignore_ascii_case(key))
            .map(|s| s.value.as_str())
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.segment_value("resourceGroups")
    }

    /// Collection key of the final path pair.
    pub fn kind(&self) -> &str {
        &self.segments[self.segments.len() - 1].key
    }

    /// Name of the final path pair.
    pub fn name(&self) -> &str {
        &self.segments[self.segments.len() - 1].value
    }

    /// The name of the final pair, after checking that its collection key is
    /// the expected one for the resource type being handled.
    pub fn expect_terminal(&self, collection: &str) -> Result<&str> {
        if self.kind().eq_ignore_ascii_case(collection) {
            Ok(self.name())
        } else {
            Err(Error::InvalidIdentifier {
                id: self.raw.clone(),
                reason: format!("expected a {} identifier, found {}", collection, self.kind()),
            })
        }
    }

    /// Identifier of the owning container, or `None` at the hierarchy root.
    pub fn parent(&self) -> Option<ResourceIdentifier> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self::from_segments(segments))
    }

    /// Construct the identifier of a child entity under this one.
    pub fn child(&self, collection: &str, name: &str) -> Result<ResourceIdentifier> {
        if collection.is_empty() || name.is_empty() {
            return Err(Error::InvalidIdentifier {
                id: self.raw.clone(),
                reason: "child collection and name must be non-empty".to_string(),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(Segment {
            key: collection.to_string(),
            value: name.to_string(),
        });
        Ok(Self::from_segments(segments))
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Two identifiers are equal iff their decoded segments are equal: keys
/// case-insensitively, values exactly.
impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.key.eq_ignore_ascii_case(&b.key) && a.value == b.value)
    }
}

impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for seg in &self.segments {
            seg.key.to_ascii_lowercase().hash(state);
            seg.value.hash(state);
        }
    }
}
