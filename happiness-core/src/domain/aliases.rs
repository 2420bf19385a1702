// happiness-core/src/domain/aliases.rs
//
// Declarative (source -> canonical) column aliases used by the reconciler.
// The multi-year report and the 2021 snapshot name the same indicators
// differently; the 2021 spelling is canonical.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::naming::normalise;

/// Default alias table: multi-year spelling -> 2021 spelling.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("life_ladder", "ladder_score"),
    ("log_gdp_per_capita", "logged_gdp_per_capita"),
    ("healthy_life_expectancy_at_birth", "healthy_life_expectancy"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMap {
    // Keys are normalised source names.
    entries: BTreeMap<String, String>,
}

impl Default for AliasMap {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_ALIASES.iter().copied())
    }
}

impl AliasMap {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let entries = pairs
            .into_iter()
            .map(|(source, canonical)| (normalise(source), canonical.to_string()))
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical name for an already-normalised column name, if aliased.
    pub fn canonical(&self, normalised_name: &str) -> Option<&str> {
        self.entries.get(normalised_name).map(String::as_str)
    }

    /// Resolve one column: normalise it, then follow the alias if any.
    pub fn resolve(&self, column: &str) -> String {
        let norm = normalise(column);
        match self.canonical(&norm) {
            Some(canonical) => canonical.to_string(),
            None => norm,
        }
    }

    /// Build the canonical -> original column mapping for one table.
    ///
    /// The first original column wins when two columns collapse onto the same
    /// canonical name; the losers are returned so callers can log them.
    pub fn plan(&self, columns: &[String]) -> ColumnPlan {
        let mut mapping: HashMap<String, String> = HashMap::new();
        let mut order = Vec::new();
        let mut shadowed = Vec::new();

        for column in columns {
            let canonical = self.resolve(column);
            if mapping.contains_key(&canonical) {
                shadowed.push(column.clone());
                continue;
            }
            mapping.insert(canonical.clone(), column.clone());
            order.push(canonical);
        }

        ColumnPlan {
            mapping,
            order,
            shadowed,
        }
    }

    /// The table as sorted pairs, for logs and docs.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// How the columns of one table map onto canonical names.
#[derive(Debug, Clone, Default)]
pub struct ColumnPlan {
    mapping: HashMap<String, String>,
    order: Vec<String>,
    pub shadowed: Vec<String>,
}

impl ColumnPlan {
    pub fn source_of(&self, canonical: &str) -> Option<&str> {
        self.mapping.get(canonical).map(String::as_str)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.mapping.contains_key(canonical)
    }

    /// Canonical names in the table's original column order.
    pub fn canonical_columns(&self) -> &[String] {
        &self.order
    }

    /// Columns whose canonical name differs from the source spelling.
    pub fn renames(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|canonical| {
                let source = self.mapping.get(canonical)?;
                (source != canonical).then(|| (source.clone(), canonical.clone()))
            })
            .collect()
    }
}

/// Canonical columns present in both plans, sorted alphabetically.
pub fn shared_columns(left: &ColumnPlan, right: &ColumnPlan) -> Vec<String> {
    let mut shared: Vec<String> = left
        .canonical_columns()
        .iter()
        .filter(|c| right.contains(c))
        .cloned()
        .collect();
    shared.sort();
    shared
}
