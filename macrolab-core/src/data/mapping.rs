//! Provider code → semantic column name mapping.
//!
//! Providers label series with their own identifiers (`CPIAUCSL`, `^GSPC`).
//! The mapping is a plain ordered lookup table so that renaming stays a pure
//! data transform.

use super::table::TableError;
use std::collections::HashSet;

/// One-to-one mapping from provider codes to column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Build a mapping, rejecting repeated codes or repeated target names.
    pub fn new<I, S, T>(pairs: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        let mut entries = Vec::new();
        for (code, name) in pairs {
            let (code, name) = (code.into(), name.into());
            if !codes.insert(code.clone()) {
                return Err(TableError::DuplicateMapping(code));
            }
            if !names.insert(name.clone()) {
                return Err(TableError::DuplicateMapping(name));
            }
            entries.push((code, name));
        }
        Ok(Self { entries })
    }

    /// Semantic name for `code`; unmapped codes come back unchanged.
    pub fn apply<'a>(&'a self, code: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, n)| n.as_str())
            .unwrap_or(code)
    }

    /// Provider code that maps to `name`.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, n)| n == name)
            .map(|(c, _)| c.as_str())
    }

    /// Provider codes in declaration order.
    pub fn sources(&self) -> Vec<String> {
        self.entries.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Column names in declaration order.
    pub fn targets(&self) -> Vec<String> {
        self.entries.iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
