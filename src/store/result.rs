//! Materialized read results.
//!
//! A [`ResultSet`] holds the column names once and the decoded values per row.
//! Callers pick the shape they want: ordered JSON-style mappings, fixed-field
//! [`Record`]s sharing one field tuple, or a typed struct via serde.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use sqlx::any::AnyRow;
use sqlx::{Column, Row};

use crate::errors::StoreError;
use crate::store::params::SqlValue;

/// Column-name-keyed row, in column order.
pub type RowMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.into(),
            rows,
        }
    }

    /// Decode driver rows. `columns` comes from the prepared statement so it
    /// is known even when no rows matched; if the driver reported none, the
    /// first row's columns are used instead.
    pub(crate) fn from_rows(columns: Vec<String>, rows: &[AnyRow]) -> Result<Self, StoreError> {
        let columns = match rows.first() {
            Some(first) if columns.is_empty() => first
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            _ => columns,
        };

        let decoded = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| decode_value(row, idx))
                    .collect::<Result<Vec<SqlValue>, StoreError>>()
            })
            .collect::<Result<Vec<Vec<SqlValue>>, StoreError>>()?;

        Ok(Self::new(columns, decoded))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One ordered mapping per row.
    pub fn mappings(&self) -> Vec<RowMap> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, value)| (col.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }

    /// One record per row, all sharing the same field tuple.
    pub fn records(&self) -> Result<Vec<Record>, StoreError> {
        if self.rows.is_empty() && self.columns.is_empty() {
            return Err(StoreError::EmptyResult);
        }
        Ok(self
            .rows
            .iter()
            .map(|values| Record {
                fields: Arc::clone(&self.columns),
                values: values.clone(),
            })
            .collect())
    }

    /// Deserialize every row mapping into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        self.mappings()
            .into_iter()
            .map(|row| {
                serde_json::from_value(serde_json::Value::Object(row))
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .collect()
    }
}

/// A fixed-shape row whose field names equal the query's column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Record {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.fields
            .iter()
            .position(|f| f == field)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn at(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    /// Whether two records were produced by the same result set.
    pub fn same_shape(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

/// Try the Any driver's value kinds from most to least specific.
fn decode_value(row: &AnyRow, idx: usize) -> Result<SqlValue, StoreError> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Float));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bool));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Text));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bytes));
    }
    let name = row.columns().get(idx).map(|c| c.name().to_string()).unwrap_or_default();
    Err(StoreError::Decode(format!("column '{}' has an unsupported type", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                vec![SqlValue::Int(1), SqlValue::from("Zezima"), SqlValue::Float(99.5)],
                vec![SqlValue::Int(2), SqlValue::Null, SqlValue::Float(12.0)],
            ],
        )
    }

    #[test]
    fn test_mappings_preserve_column_order() {
        let maps = sample().mappings();
        let keys: Vec<&str> = maps[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "score"]);
        assert_eq!(maps[0]["name"], "Zezima");
        assert!(maps[1]["name"].is_null());
    }

    #[test]
    fn test_records_share_field_tuple() {
        let records = sample().records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].same_shape(&records[1]));
        let fields: Vec<&str> = records[0].fields().iter().map(String::as_str).collect();
        assert_eq!(fields, vec!["id", "name", "score"]);
        assert_eq!(records[1].get("id"), Some(&SqlValue::Int(2)));
        assert_eq!(records[0].at(1), Some(&SqlValue::from("Zezima")));
        assert_eq!(records[0].get("missing"), None);
    }

    #[test]
    fn test_mappings_and_records_agree() {
        let rs = sample();
        let maps = rs.mappings();
        let records = rs.records().unwrap();
        for (map, record) in maps.iter().zip(&records) {
            for field in record.fields() {
                assert_eq!(map[field.as_str()], record.get(field).unwrap().to_json());
            }
        }
    }

    #[test]
    fn test_records_on_empty_columnless_result_fails() {
        let rs = ResultSet::new(vec![], vec![]);
        assert!(matches!(rs.records(), Err(StoreError::EmptyResult)));
    }

    #[test]
    fn test_records_on_empty_result_with_columns_is_empty() {
        let rs = ResultSet::new(vec!["id".into()], vec![]);
        assert!(rs.records().unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Deserialize)]
        struct Row {
            id: i64,
            name: Option<String>,
        }
        let rows: Vec<Row> = sample().deserialize().unwrap();
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].name.as_deref(), Some("Zezima"));
        assert!(rows[1].name.is_none());
    }

    #[test]
    fn test_deserialize_type_mismatch_is_decode_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Row {
            name: i64,
        }
        let err = sample().deserialize::<Row>().unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
