// happiness-core/src/domain/schema.rs
//
// Fixed column vocabularies of the three bronze datasets.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Country,
    Year,
    Numeric,
    Region,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }

    /// DuckDB type the cleaner coerces this kind of column to.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Year => "INTEGER",
            ColumnKind::Numeric => "DOUBLE",
            ColumnKind::Country | ColumnKind::Region | ColumnKind::Text => "VARCHAR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    MultiYear,
    Snapshot2021,
    Geolocation,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dataset::MultiYear => "multi_year",
            Dataset::Snapshot2021 => "snapshot_2021",
            Dataset::Geolocation => "geolocation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

use ColumnKind::{Country, Numeric, Region, Text, Year};

const MULTI_YEAR_COLUMNS: &[ColumnSpec] = &[
    col("country_name", Country),
    col("year", Year),
    col("life_ladder", Numeric),
    col("log_gdp_per_capita", Numeric),
    col("social_support", Numeric),
    col("healthy_life_expectancy_at_birth", Numeric),
    col("freedom_to_make_life_choices", Numeric),
    col("generosity", Numeric),
    col("perceptions_of_corruption", Numeric),
    col("positive_affect", Numeric),
    col("negative_affect", Numeric),
];

const SNAPSHOT_2021_COLUMNS: &[ColumnSpec] = &[
    col("country_name", Country),
    col("regional_indicator", Region),
    col("ladder_score", Numeric),
    col("standard_error_of_ladder_score", Numeric),
    col("upperwhisker", Numeric),
    col("lowerwhisker", Numeric),
    col("logged_gdp_per_capita", Numeric),
    col("social_support", Numeric),
    col("healthy_life_expectancy", Numeric),
    col("freedom_to_make_life_choices", Numeric),
    col("generosity", Numeric),
    col("perceptions_of_corruption", Numeric),
    col("ladder_score_in_dystopia", Numeric),
    col("explained_by_log_gdp_per_capita", Numeric),
    col("explained_by_social_support", Numeric),
    col("explained_by_healthy_life_expectancy", Numeric),
    col("explained_by_freedom_to_make_life_choices", Numeric),
    col("explained_by_generosity", Numeric),
    col("explained_by_perceptions_of_corruption", Numeric),
    col("dystopia_residual", Numeric),
    col("year", Year),
];

const GEOLOCATION_COLUMNS: &[ColumnSpec] = &[
    col("country", Text),
    col("country_name", Country),
    col("latitude", Numeric),
    col("longitude", Numeric),
];

/// Region labels rewritten by the cleaner (old label, new label).
pub const REGION_REPLACEMENTS: &[(&str, &str)] = &[
    ("Eastern Asia", "East Asia"),
    ("Southeastern Asia", "Southeast Asia"),
    ("Southern Asia", "South Asia"),
];

pub const SNAPSHOT_YEAR: i32 = 2021;

/// Vocabulary and source renames for one bronze dataset.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSchema {
    pub dataset: Dataset,
    pub columns: &'static [ColumnSpec],
    /// Applied after snake casing, only when the target is absent.
    pub renames: &'static [(&'static str, &'static str)],
    /// Year used when the source carries no `year` column.
    pub default_year: Option<i32>,
}

impl DatasetSchema {
    pub fn multi_year() -> Self {
        Self {
            dataset: Dataset::MultiYear,
            columns: MULTI_YEAR_COLUMNS,
            renames: &[("country", "country_name")],
            default_year: None,
        }
    }

    pub fn snapshot_2021() -> Self {
        Self {
            dataset: Dataset::Snapshot2021,
            columns: SNAPSHOT_2021_COLUMNS,
            renames: &[("country", "country_name")],
            default_year: Some(SNAPSHOT_YEAR),
        }
    }

    pub fn geolocation() -> Self {
        Self {
            dataset: Dataset::Geolocation,
            columns: GEOLOCATION_COLUMNS,
            renames: &[("name", "country_name")],
            default_year: None,
        }
    }

    pub fn for_dataset(dataset: Dataset) -> Self {
        match dataset {
            Dataset::MultiYear => Self::multi_year(),
            Dataset::Snapshot2021 => Self::snapshot_2021(),
            Dataset::Geolocation => Self::geolocation(),
        }
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|spec| spec.name == column)
            .map(|spec| spec.kind)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.kind_of(column).is_some()
    }

    pub fn has_year(&self) -> bool {
        self.columns.iter().any(|spec| spec.kind == ColumnKind::Year)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .filter(|spec| spec.kind.is_numeric())
            .map(|spec| spec.name)
    }

    /// Source rename for an already snake-cased column, if any.
    pub fn rename_for(&self, column: &str) -> Option<&'static str> {
        self.renames
            .iter()
            .find(|(from, _)| *from == column)
            .map(|(_, to)| *to)
    }
}

pub fn replace_region(label: &str) -> &str {
    REGION_REPLACEMENTS
        .iter()
        .find(|(old, _)| *old == label)
        .map(|(_, new)| *new)
        .unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabularies_have_country_column() {
        for dataset in [Dataset::MultiYear, Dataset::Snapshot2021, Dataset::Geolocation] {
            let schema = DatasetSchema::for_dataset(dataset);
            assert_eq!(schema.kind_of("country_name"), Some(ColumnKind::Country));
        }
    }

    #[test]
    fn test_snapshot_defaults_year() {
        let schema = DatasetSchema::snapshot_2021();
        assert_eq!(schema.default_year, Some(2021));
        assert!(schema.has_year());
        assert_eq!(schema.kind_of("regional_indicator"), Some(ColumnKind::Region));
        assert_eq!(schema.numeric_columns().count(), 18);
    }

    #[test]
    fn test_geolocation_renames_name_column() {
        let schema = DatasetSchema::geolocation();
        assert_eq!(schema.rename_for("name"), Some("country_name"));
        assert_eq!(schema.rename_for("country"), None);
        assert!(!schema.has_year());
    }

    #[test]
    fn test_region_replacements() {
        assert_eq!(replace_region("Eastern Asia"), "East Asia");
        assert_eq!(replace_region("Southern Asia"), "South Asia");
        assert_eq!(replace_region("Western Europe"), "Western Europe");
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(ColumnKind::Year.sql_type(), "INTEGER");
        assert_eq!(ColumnKind::Numeric.sql_type(), "DOUBLE");
        assert_eq!(ColumnKind::Region.sql_type(), "VARCHAR");
    }
}
