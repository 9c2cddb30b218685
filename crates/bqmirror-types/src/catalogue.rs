//! Catalogue entry model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an entry is replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Direct table-to-table copy.
    Table,
    /// Materialized by running `SELECT *` against the view.
    View,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "table",
            Self::View => "view",
        };
        f.write_str(s)
    }
}

/// A single named object in the replication catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl CatalogueEntry {
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Table,
        }
    }

    #[must_use]
    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::View,
        }
    }
}

impl fmt::Display for CatalogueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}
