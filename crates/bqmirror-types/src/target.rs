//! Fully-qualified warehouse references and the replication target.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dataset within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub project: String,
    pub dataset: String,
}

impl DatasetRef {
    #[must_use]
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    /// Reference a table inside this dataset.
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> TableRef {
        TableRef {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: table.into(),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.dataset)
    }
}

/// A table or view, addressed as `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    #[must_use]
    pub fn dataset_ref(&self) -> DatasetRef {
        DatasetRef::new(self.project.clone(), self.dataset.clone())
    }

    /// Backtick-quoted form for use in standard SQL.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Where a run reads from and writes to. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTarget {
    pub source: DatasetRef,
    pub destination: DatasetRef,
    /// Region for copy jobs. `None` lets the warehouse infer it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ReplicationTarget {
    #[must_use]
    pub fn source_table(&self, name: &str) -> TableRef {
        self.source.table(name)
    }

    #[must_use]
    pub fn destination_table(&self, name: &str) -> TableRef {
        self.destination.table(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ReplicationTarget {
        ReplicationTarget {
            source: DatasetRef::new("ops-prod", "ade_api"),
            destination: DatasetRef::new("agentspace-dev", "mirror"),
            location: None,
        }
    }

    #[test]
    fn table_refs_are_fully_qualified() {
        let t = target();
        assert_eq!(t.source_table("users").to_string(), "ops-prod.ade_api.users");
        assert_eq!(
            t.destination_table("users").to_string(),
            "agentspace-dev.mirror.users"
        );
    }

    #[test]
    fn quoted_uses_backticks() {
        let r = TableRef::new("p", "d", "t");
        assert_eq!(r.quoted(), "`p.d.t`");
    }

    #[test]
    fn dataset_ref_roundtrips_through_table() {
        let ds = DatasetRef::new("p", "d");
        assert_eq!(ds.table("t").dataset_ref(), ds);
    }
}
