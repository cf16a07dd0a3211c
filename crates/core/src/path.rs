//! Pseudo-path parsing
//!
//! Files have no directory, only tags. A pseudo-path spells a lookup:
//!
//! ```text
//! /tag1/tag2/.../tagK/filename
//! ```
//!
//! Every component but the last is a required tag, the last is the filename.
//! Zero tags is legal (`/filename` or `filename`). Empty components are
//! rejected, so `//a`, `/a//b` and `/a/` are all invalid. A tag repeated in
//! one path counts once.

use crate::error::{Error, Result};
use crate::limits::validate_tag_len;
use std::fmt;

/// Path component separator
pub const SEPARATOR: char = '/';

/// Validate a single tag name outside of a path
///
/// A tag must be non-empty (the empty name is the reserved universal tag),
/// must not contain the separator, and must respect the length bound.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::invalid_argument(
            "the empty tag is reserved for the universal set",
        ));
    }
    if tag.contains(SEPARATOR) {
        return Err(Error::invalid_argument(format!(
            "tag '{}' contains a separator",
            tag
        )));
    }
    validate_tag_len(tag)
}

/// A parsed pseudo-path: required tags plus a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPath {
    tags: Vec<String>,
    filename: String,
}

impl TagPath {
    /// Parse a pseudo-path
    ///
    /// # Errors
    /// `Error::InvalidArgument` for an empty path, an empty component, or a
    /// missing filename.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.strip_prefix(SEPARATOR).unwrap_or(path);
        if trimmed.is_empty() {
            return Err(Error::invalid_argument(format!(
                "path '{}' has no file name",
                path
            )));
        }

        let mut components: Vec<&str> = trimmed.split(SEPARATOR).collect();
        // split always yields at least one item
        let filename = components.pop().unwrap_or_default();
        if filename.is_empty() {
            return Err(Error::invalid_argument(format!(
                "path '{}' has no file name",
                path
            )));
        }

        let mut tags: Vec<String> = Vec::with_capacity(components.len());
        for tag in components {
            if tag.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "path '{}' has an empty tag component",
                    path
                )));
            }
            validate_tag_len(tag)?;
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Ok(Self {
            tags,
            filename: filename.to_string(),
        })
    }

    /// Build a path from parts, validating them the same way `parse` does
    pub fn from_parts<I, S>(tags: I, filename: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filename = filename.into();
        let mut rendered = String::new();
        for tag in tags {
            rendered.push(SEPARATOR);
            rendered.push_str(&tag.into());
        }
        rendered.push(SEPARATOR);
        rendered.push_str(&filename);
        let parsed = Self::parse(&rendered)?;
        if parsed.filename != filename {
            return Err(Error::invalid_argument(format!(
                "file name '{}' contains a separator",
                filename
            )));
        }
        Ok(parsed)
    }

    /// Required tags, in first-seen order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Final component
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Split into (tags, filename)
    pub fn into_parts(self) -> (Vec<String>, String) {
        (self.tags, self.filename)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.tags {
            write!(f, "{}{}", SEPARATOR, tag)?;
        }
        write!(f, "{}{}", SEPARATOR, self.filename)
    }
}
