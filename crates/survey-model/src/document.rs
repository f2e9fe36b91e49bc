//! Declarative configuration documents.
//!
//! Each document is a TOML file holding an ordered list of named entries.
//! Documents are optional: a missing file loads as an empty list. A file
//! that exists but cannot be read or parsed yields a [`ConfigError`]; the
//! bundle loaders record it and fall back to an empty list for that document.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::definition::{ColumnOrder, DerivedColumn, Filter};
use crate::error::{ConfigError, Result, ValidationError};
use crate::settings::AnalysisSettings;

/// A document made of an ordered list of entries.
///
/// Positions are 0-based. Indexed access returns [`ValidationError`]
/// instead of panicking.
pub trait ConfigDocument: Serialize + DeserializeOwned + Default {
    type Entry;

    /// Short name used in error messages.
    const KIND: &'static str;
    /// Comment written at the top of saved files.
    const HEADER: &'static str;

    fn entries(&self) -> &[Self::Entry];
    fn entries_mut(&mut self) -> &mut Vec<Self::Entry>;
    fn into_entries(self) -> Vec<Self::Entry>;
    fn from_entries(entries: Vec<Self::Entry>) -> Self;

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn get(&self, position: usize) -> std::result::Result<&Self::Entry, ValidationError> {
        let len = self.len();
        self.entries()
            .get(position)
            .ok_or(ValidationError::PositionOutOfRange {
                kind: Self::KIND,
                position,
                len,
            })
    }

    /// Replaces the entry at `position`, returning the previous one.
    fn replace(
        &mut self,
        position: usize,
        entry: Self::Entry,
    ) -> std::result::Result<Self::Entry, ValidationError> {
        let len = self.len();
        let slot = self
            .entries_mut()
            .get_mut(position)
            .ok_or(ValidationError::PositionOutOfRange {
                kind: Self::KIND,
                position,
                len,
            })?;
        Ok(std::mem::replace(slot, entry))
    }

    fn remove(&mut self, position: usize) -> std::result::Result<Self::Entry, ValidationError> {
        let len = self.len();
        if position >= len {
            return Err(ValidationError::PositionOutOfRange {
                kind: Self::KIND,
                position,
                len,
            });
        }
        Ok(self.entries_mut().remove(position))
    }

    fn push(&mut self, entry: Self::Entry) {
        self.entries_mut().push(entry);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumnsDocument {
    #[serde(default)]
    pub derived_columns: Vec<DerivedColumn>,
}

impl DerivedColumnsDocument {
    /// Appends copies of `templates[i]` for each `i` in `indices`.
    ///
    /// Indices past the end are skipped. A name already present gets the
    /// first free suffix `" (2)"`, `" (3)"`, ... Returns the number of
    /// entries appended.
    pub fn import_templates(&mut self, templates: &[DerivedColumn], indices: &[usize]) -> usize {
        let mut taken: HashSet<String> = self
            .derived_columns
            .iter()
            .map(|column| column.name.clone())
            .collect();
        let mut imported = 0;
        for &index in indices {
            let Some(template) = templates.get(index) else {
                debug!(index, templates = templates.len(), "skipping unknown template index");
                continue;
            };
            let mut entry = template.clone();
            entry.name = unique_name(&template.name, &taken);
            taken.insert(entry.name.clone());
            self.derived_columns.push(entry);
            imported += 1;
        }
        imported
    }
}

fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{name} ({counter})");
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersDocument {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOrdersDocument {
    #[serde(default)]
    pub column_orders: Vec<ColumnOrder>,
}

macro_rules! config_document {
    ($doc:ty, $entry:ty, $field:ident, $kind:literal, $header:literal) => {
        impl ConfigDocument for $doc {
            type Entry = $entry;
            const KIND: &'static str = $kind;
            const HEADER: &'static str = $header;

            fn entries(&self) -> &[Self::Entry] {
                &self.$field
            }

            fn entries_mut(&mut self) -> &mut Vec<Self::Entry> {
                &mut self.$field
            }

            fn into_entries(self) -> Vec<Self::Entry> {
                self.$field
            }

            fn from_entries(entries: Vec<Self::Entry>) -> Self {
                Self { $field: entries }
            }
        }
    };
}

config_document!(
    DerivedColumnsDocument,
    DerivedColumn,
    derived_columns,
    "derived column",
    "# Derived column definitions\n# Virtual columns computed from base columns.\n"
);
config_document!(
    FiltersDocument,
    Filter,
    filters,
    "filter",
    "# Filter definitions\n# Named row filters applied before tabulation.\n"
);
config_document!(
    ColumnOrdersDocument,
    ColumnOrder,
    column_orders,
    "column order",
    "# Column value display orders\n# Controls the order of values in tables and pivots.\n"
);

/// Parses a document from TOML text. `path` is only used for error messages.
pub fn parse_document<D: ConfigDocument>(text: &str, path: &Path) -> Result<D> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        kind: D::KIND,
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a document, returning `Ok(None)` when the file does not exist.
pub fn load_document<D: ConfigDocument>(path: &Path) -> Result<Option<D>> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_document(&text, path).map(Some),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes a document with its comment header.
pub fn save_document<D: ConfigDocument>(path: &Path, document: &D) -> Result<()> {
    let body = toml::to_string(document).map_err(|source| ConfigError::Serialize {
        kind: D::KIND,
        source,
    })?;
    let contents = format!("{}\n{body}", D::HEADER);
    std::fs::write(path, contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Locations of the configuration documents for one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub derived_columns: PathBuf,
    pub filters: PathBuf,
    pub column_orders: PathBuf,
    pub settings: PathBuf,
}

impl ConfigPaths {
    pub const DEFAULT_DIR: &'static str = "configs";

    /// Standard file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            derived_columns: dir.join("derived_columns.toml"),
            filters: dir.join("filters.toml"),
            column_orders: dir.join("column_orders.toml"),
            settings: dir.join("settings.toml"),
        }
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::in_dir(Self::DEFAULT_DIR)
    }
}

/// The read-only definition sets one engine instance is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    pub derived_columns: Vec<DerivedColumn>,
    pub filters: Vec<Filter>,
    pub column_orders: Vec<ColumnOrder>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_derived(mut self, derived: DerivedColumn) -> Self {
        self.derived_columns.push(derived);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, order: ColumnOrder) -> Self {
        self.column_orders.push(order);
        self
    }
}

/// Result of loading every configuration document for an analysis.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub definitions: Definitions,
    pub settings: AnalysisSettings,
    /// Errors for documents that were present but unusable.
    pub errors: Vec<ConfigError>,
}

/// Loads all documents named by `paths`, substituting empty sets (or
/// default settings) for documents that fail.
pub fn load_config(paths: &ConfigPaths) -> LoadedConfig {
    let mut errors = Vec::new();
    let derived_columns =
        load_or_empty::<DerivedColumnsDocument>(&paths.derived_columns, &mut errors);
    let filters = load_or_empty::<FiltersDocument>(&paths.filters, &mut errors);
    let column_orders = load_or_empty::<ColumnOrdersDocument>(&paths.column_orders, &mut errors);
    let settings = match load_settings(&paths.settings) {
        Ok(settings) => settings.unwrap_or_default(),
        Err(error) => {
            warn!(%error, "using default analysis settings");
            errors.push(error);
            AnalysisSettings::default()
        }
    };

    debug!(
        derived_columns = derived_columns.len(),
        filters = filters.len(),
        column_orders = column_orders.len(),
        failed_documents = errors.len(),
        "configuration loaded"
    );

    LoadedConfig {
        definitions: Definitions {
            derived_columns,
            filters,
            column_orders,
        },
        settings,
        errors,
    }
}

fn load_or_empty<D: ConfigDocument>(path: &Path, errors: &mut Vec<ConfigError>) -> Vec<D::Entry> {
    match load_document::<D>(path) {
        Ok(Some(document)) => document.into_entries(),
        Ok(None) => Vec::new(),
        Err(error) => {
            warn!(kind = D::KIND, %error, "ignoring unusable config document");
            errors.push(error);
            Vec::new()
        }
    }
}

/// Loads settings, returning `Ok(None)` when the file does not exist.
pub fn load_settings(path: &Path) -> Result<Option<AnalysisSettings>> {
    match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                kind: "settings",
                path: path.to_path_buf(),
                source,
            }),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CalculationType, FilterCondition};

    fn two_filters() -> FiltersDocument {
        FiltersDocument::from_entries(vec![
            Filter::new("a", vec![FilterCondition::include("q1", &["x"])]),
            Filter::new("b", Vec::new()),
        ])
    }

    #[test]
    fn indexed_access_is_bounds_checked() {
        let mut doc = two_filters();
        assert_eq!(doc.get(1).map(|f| f.name.as_str()), Ok("b"));
        assert_eq!(
            doc.get(2).unwrap_err(),
            ValidationError::PositionOutOfRange {
                kind: "filter",
                position: 2,
                len: 2
            }
        );
        assert!(doc.remove(5).is_err());
        assert!(doc.replace(9, Filter::new("c", Vec::new())).is_err());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn replace_returns_previous_entry() {
        let mut doc = two_filters();
        let old = doc.replace(0, Filter::new("z", Vec::new())).unwrap();
        assert_eq!(old.name, "a");
        assert_eq!(doc.entries()[0].name, "z");
        let removed = doc.remove(0).unwrap();
        assert_eq!(removed.name, "z");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn imported_templates_get_numbered_names() {
        let mut doc = DerivedColumnsDocument::from_entries(vec![DerivedColumn::new(
            "学年",
            CalculationType::GradeFromBirthdate,
        )]);
        let templates = vec![
            DerivedColumn::new("学年", CalculationType::GradeFromBirthdate),
            DerivedColumn::new("エリア", CalculationType::Rules),
            DerivedColumn::new("学年", CalculationType::SchoolTypeFromBirthdate),
        ];

        let imported = doc.import_templates(&templates, &[0, 2, 9, 1]);

        assert_eq!(imported, 3);
        let names: Vec<_> = doc.entries().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["学年", "学年 (2)", "学年 (3)", "エリア"]);
        assert_eq!(
            doc.entries()[2].calculation_type,
            CalculationType::SchoolTypeFromBirthdate
        );
    }

    #[test]
    fn importing_the_same_template_twice_keeps_names_unique() {
        let mut doc = DerivedColumnsDocument::default();
        let templates = vec![DerivedColumn::new("pets", CalculationType::Merge)];

        assert_eq!(doc.import_templates(&templates, &[0, 0]), 2);
        assert_eq!(doc.import_templates(&templates, &[]), 0);

        let names: Vec<_> = doc.entries().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pets", "pets (2)"]);
    }

    #[test]
    fn paths_in_dir() {
        let paths = ConfigPaths::in_dir("/tmp/proj");
        assert_eq!(paths.filters, PathBuf::from("/tmp/proj/filters.toml"));
        assert_eq!(
            ConfigPaths::default().derived_columns,
            PathBuf::from("configs/derived_columns.toml")
        );
    }
}
