//! The fixed list of tables and views a run replicates.

use bqmirror_types::CatalogueEntry;

/// Ordered table and view names. Order only affects reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    tables: Vec<String>,
    views: Vec<String>,
}

impl Catalogue {
    #[must_use]
    pub fn new(tables: Vec<String>, views: Vec<String>) -> Self {
        Self { tables, views }
    }

    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    #[must_use]
    pub fn views(&self) -> &[String] {
        &self.views
    }

    /// All entries, tables first, each group in configured order.
    #[must_use]
    pub fn entries(&self) -> Vec<CatalogueEntry> {
        self.tables
            .iter()
            .map(|name| CatalogueEntry::table(name.clone()))
            .chain(self.views.iter().map(|name| CatalogueEntry::view(name.clone())))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len() + self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.views.is_empty()
    }

    /// Render as the `tables:`/`views:` YAML block used in config files.
    #[must_use]
    pub fn to_yaml_snippet(&self) -> String {
        let mut out = String::new();
        for (key, names) in [("tables", &self.tables), ("views", &self.views)] {
            if names.is_empty() {
                out.push_str(&format!("{key}: []\n"));
                continue;
            }
            out.push_str(&format!("{key}:\n"));
            for name in names {
                out.push_str(&format!("  - {name}\n"));
            }
        }
        out
    }
}

impl FromIterator<CatalogueEntry> for Catalogue {
    fn from_iter<I: IntoIterator<Item = CatalogueEntry>>(iter: I) -> Self {
        let mut catalogue = Self::default();
        for entry in iter {
            match entry.kind {
                bqmirror_types::EntryKind::Table => catalogue.tables.push(entry.name),
                bqmirror_types::EntryKind::View => catalogue.views.push(entry.name),
            }
        }
        catalogue
    }
}
