//! Dotted path expressions used by shared blocks.
//!
//! `envs.*.servers.*.cpu` is parsed once into segments; a `*` selects every
//! value of an object, any other token names a single key. The final segment
//! always names the key to write, so it can never be a wildcard.

use std::fmt;
use std::str::FromStr;

use crate::error::ComposeError;

pub const WILDCARD: &str = "*";
pub const SEPARATOR: char = '.';

/// One step of a [`SharedPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Wildcard,
}

impl Segment {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// A validated, non-empty path whose last segment is a literal key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharedPath {
    segments: Vec<Segment>,
}

impl SharedPath {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The key written at the end of the path.
    pub fn target_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for SharedPath {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ComposeError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for token in s.split(SEPARATOR) {
            if token.is_empty() {
                return Err(invalid("path contains an empty segment"));
            }
            if token == WILDCARD {
                segments.push(Segment::Wildcard);
            } else {
                segments.push(Segment::Key(token.to_string()));
            }
        }

        if segments.last().map_or(true, Segment::is_wildcard) {
            return Err(invalid("the last segment must be a key, not a wildcard"));
        }

        Ok(SharedPath { segments })
    }
}

impl fmt::Display for SharedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
