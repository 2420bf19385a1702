// happiness-core/src/domain/frame.rs
//
// In-memory copy of a table: column names plus typed cells.
// The EDA toolkit and the dashboard only ever work on clones of a Frame.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Frame {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), DomainError> {
        if row.len() != self.columns.len() {
            return Err(DomainError::SchemaError(format!(
                "row of width {} pushed into '{}' with {} columns",
                row.len(),
                self.name,
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn require(&self, column: &str) -> Result<usize, DomainError> {
        self.column_index(column)
            .ok_or_else(|| DomainError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Values of one column (nulls included).
    pub fn column(&self, column: &str) -> Result<Vec<&CellValue>, DomainError> {
        let idx = self.require(column)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Non-null numeric values of one column.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<f64>, DomainError> {
        let idx = self.require(column)?;
        Ok(self.rows.iter().filter_map(|r| r[idx].as_f64()).collect())
    }

    /// A column is numeric when it has at least one value and every
    /// non-null value is a number.
    pub fn is_numeric_column(&self, column: &str) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        let mut seen = false;
        for row in &self.rows {
            match &row[idx] {
                CellValue::Null => {}
                v if v.is_numeric() => seen = true,
                _ => return false,
            }
        }
        seen
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.is_numeric_column(c))
            .cloned()
            .collect()
    }

    pub fn text_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !self.is_numeric_column(c))
            .cloned()
            .collect()
    }

    /// Sorted distinct text values of a column.
    pub fn distinct_text(&self, column: &str) -> Result<Vec<String>, DomainError> {
        let idx = self.require(column)?;
        let set: BTreeSet<&str> = self.rows.iter().filter_map(|r| r[idx].as_str()).collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    /// Sorted distinct integer values of a column (years).
    pub fn distinct_ints(&self, column: &str) -> Result<Vec<i64>, DomainError> {
        let idx = self.require(column)?;
        let set: BTreeSet<i64> = self.rows.iter().filter_map(|r| r[idx].as_i64()).collect();
        Ok(set.into_iter().collect())
    }

    pub fn null_count(&self, column: &str) -> Result<usize, DomainError> {
        let idx = self.require(column)?;
        Ok(self.rows.iter().filter(|r| r[idx].is_null()).count())
    }

    /// Keep the rows matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Frame
    where
        F: Fn(&[CellValue]) -> bool,
    {
        Frame {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        }
    }

    /// Project onto a subset of columns, in the given order.
    pub fn select(&self, columns: &[String]) -> Result<Frame, DomainError> {
        let indices = columns
            .iter()
            .map(|c| self.require(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Frame {
            name: self.name.clone(),
            columns: columns.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    pub fn head(&self, n: usize) -> Frame {
        Frame {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn tail(&self, n: usize) -> Frame {
        let skip = self.rows.len().saturating_sub(n);
        Frame {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().skip(skip).cloned().collect(),
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), cell_to_json(v)))
                    .collect()
            })
            .collect()
    }
}

fn cell_to_json(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Null => serde_json::Value::Null,
        CellValue::Bool(v) => serde_json::Value::Bool(*v),
        CellValue::Int(v) => serde_json::Value::from(*v),
        CellValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        CellValue::Text(v) => serde_json::Value::String(v.clone()),
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::gold_sample;
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_column_kinds_are_inferred_from_cells() {
        let frame = gold_sample();
        assert_eq!(
            frame.numeric_columns(),
            vec!["year", "ladder_score", "latitude", "longitude"]
        );
        assert_eq!(frame.text_columns(), vec!["country_name", "regional_indicator"]);
    }

    #[test]
    fn test_filter_and_select_leave_source_untouched() -> Result<()> {
        let frame = gold_sample();
        let year_idx = frame.require("year")?;
        let latest = frame.filter(|r| r[year_idx].as_i64() == Some(2021));
        let projected = latest.select(&["country_name".to_string(), "ladder_score".to_string()])?;

        assert_eq!(frame.height(), 7);
        assert_eq!(projected.height(), 4);
        assert_eq!(projected.width(), 2);
        assert_eq!(projected.rows[1][1], CellValue::Float(7.9));
        Ok(())
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let frame = gold_sample();
        let err = frame.numeric_values("happiness").unwrap_err();
        assert!(err.to_string().contains("happiness"));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut frame = Frame::new("t", vec!["a".into(), "b".into()]);
        assert!(frame.push_row(vec![CellValue::Int(1)]).is_err());
        assert!(frame.push_row(vec![CellValue::Int(1), CellValue::Null]).is_ok());
    }

    #[test]
    fn test_records_serialise_nulls() -> Result<()> {
        let frame = gold_sample();
        let records = frame.tail(3).to_records();
        let kosovo = &records[0];
        assert_eq!(kosovo["country_name"], "Kosovo");
        assert!(kosovo["latitude"].is_null());
        assert_eq!(frame.null_count("longitude")?, 1);
        assert_eq!(frame.distinct_ints("year")?, vec![2020, 2021]);
        Ok(())
    }
}
