//! Dotted attribute paths and schema-agnostic scalar lookup.
//!
//! Aggregation and comparison code never names a concrete measurement field.
//! It carries a [`FieldPath`] and asks the record to resolve it through the
//! [`Fields`] trait, which each record schema implements once.

use crate::domain::error::ClearbenchError;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const FIELD_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { raw: path.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split(FIELD_SEPARATOR)
    }

    /// The path with separators replaced by underscores, for file names.
    pub fn file_stem(&self) -> String {
        self.raw.replace(FIELD_SEPARATOR, "_")
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl FromStr for FieldPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A record whose scalar leaves can be addressed by a [`FieldPath`].
pub trait Fields {
    /// Returns the scalar at `path`, or the first segment that could not be
    /// followed.
    fn lookup<'p>(&self, path: &'p FieldPath) -> Result<f64, &'p str>;
}

pub fn resolve<R: Fields + ?Sized>(record: &R, path: &FieldPath) -> Result<f64, ClearbenchError> {
    record
        .lookup(path)
        .map_err(|segment| ClearbenchError::FieldNotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        })
}

/// `<root>_<metric path with underscores><extension>`.
pub fn figure_file_name(root: &str, path: &FieldPath, extension: &str) -> String {
    format!("{}_{}{}", root, path.file_stem(), extension)
}
