//! Bound values and named-parameter compilation.
//!
//! Statements are written with `:name` markers. Before preparing, every marker
//! outside a string literal, quoted identifier or comment is replaced with the
//! dialect's positional placeholder and its value is appended to the argument
//! list in placeholder order. Values never reach the SQL text.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::errors::StoreError;
use crate::store::dialect::Dialect;

/// A single value bound to, or read from, a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// The permission-flag "granted" sentinel: integer `1` or boolean `true`.
    pub fn is_granted(&self) -> bool {
        matches!(self, SqlValue::Int(1) | SqlValue::Bool(true))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Bytes(b) => serde_json::Value::from(b.clone()),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Named bound parameters for one statement.
///
/// `offset` and `row_count` are reserved: the executor overwrites them on
/// every read statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, SqlValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Statement text rewritten to positional placeholders, plus the values in
/// binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    values: Vec<SqlValue>,
}

impl CompiledQuery {
    pub fn compile(sql: &str, params: &Params, dialect: Dialect) -> Result<Self, StoreError> {
        let mut out = String::with_capacity(sql.len());
        let mut values: Vec<SqlValue> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        let mut chars = sql.char_indices().peekable();
        let mut quote: Option<char> = None;

        while let Some((i, c)) = chars.next() {
            if let Some(q) = quote {
                out.push(c);
                if c == '\\' && q != '`' && dialect == Dialect::MySql {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '-' if matches!(chars.peek(), Some(&(_, '-'))) => {
                    out.push(c);
                    for (_, n) in chars.by_ref() {
                        out.push(n);
                        if n == '\n' {
                            break;
                        }
                    }
                }
                '/' if matches!(chars.peek(), Some(&(_, '*'))) => {
                    out.push(c);
                    let mut prev = '\0';
                    for (_, n) in chars.by_ref() {
                        out.push(n);
                        if prev == '*' && n == '/' {
                            break;
                        }
                        prev = n;
                    }
                }
                ':' => match chars.peek() {
                    Some(&(_, ':')) => {
                        chars.next();
                        out.push_str("::");
                    }
                    Some(&(_, n)) if n.is_ascii_alphabetic() || n == '_' => {
                        let start = i + 1;
                        let mut end = start;
                        while let Some(&(j, n)) = chars.peek() {
                            if n.is_ascii_alphanumeric() || n == '_' {
                                end = j + n.len_utf8();
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        let name = &sql[start..end];
                        let value = params.get(name).ok_or_else(|| {
                            StoreError::execution(format!("missing value for bound parameter :{}", name))
                        })?;

                        // Inline NULL takes the column's type; a bound one is typed as text.
                        if value.is_null() {
                            out.push_str("NULL");
                            continue;
                        }

                        let index = match seen.iter().position(|s| *s == name) {
                            Some(pos) if dialect.numbered_placeholders() => pos + 1,
                            _ => {
                                seen.push(name);
                                values.push(value.clone());
                                values.len()
                            }
                        };
                        out.push_str(&dialect.placeholder(index));
                    }
                    _ => out.push(c),
                },
                _ => out.push(c),
            }
        }

        Ok(Self { sql: out, values })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_replaces_markers_in_order() {
        let params = Params::new().with("name", "Zezima").with("min", 10);
        let q = CompiledQuery::compile(
            "select * from players where name = :name and id >= :min",
            &params,
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(q.sql(), "select * from players where name = ? and id >= ?");
        assert_eq!(q.values(), &[SqlValue::from("Zezima"), SqlValue::Int(10)]);
    }

    #[test]
    fn test_compile_postgres_reuses_repeated_marker() {
        let params = Params::new().with("id", 7);
        let q = CompiledQuery::compile("select :id, :id + 1", &params, Dialect::Postgres).unwrap();
        assert_eq!(q.sql(), "select $1, $1 + 1");
        assert_eq!(q.values().len(), 1);
    }

    #[test]
    fn test_compile_positional_dialect_repeats_value() {
        let params = Params::new().with("id", 7);
        let q = CompiledQuery::compile("select :id, :id + 1", &params, Dialect::Sqlite).unwrap();
        assert_eq!(q.sql(), "select ?, ? + 1");
        assert_eq!(q.values(), &[SqlValue::Int(7), SqlValue::Int(7)]);
    }

    #[test]
    fn test_compile_ignores_markers_in_literals_and_comments() {
        let params = Params::new().with("real", 1);
        let sql = "select ':fake', \"col:x\", `t:y` -- :comment\n from t /* :also */ where a = :real";
        let q = CompiledQuery::compile(sql, &params, Dialect::MySql).unwrap();
        assert_eq!(
            q.sql(),
            "select ':fake', \"col:x\", `t:y` -- :comment\n from t /* :also */ where a = ?"
        );
        assert_eq!(q.values(), &[SqlValue::Int(1)]);
    }

    #[test]
    fn test_compile_writes_null_inline() {
        let params = Params::new()
            .with("id", 7)
            .with("note", None::<String>)
            .with("score", 3);
        let q = CompiledQuery::compile(
            "insert into t (id, note, score) values (:id, :note, :score)",
            &params,
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(q.sql(), "insert into t (id, note, score) values ($1, NULL, $2)");
        assert_eq!(q.values(), &[SqlValue::Int(7), SqlValue::Int(3)]);
    }

    #[test]
    fn test_compile_leaves_casts_alone() {
        let params = Params::new().with("v", "3");
        let q = CompiledQuery::compile("select :v::int", &params, Dialect::Postgres).unwrap();
        assert_eq!(q.sql(), "select $1::int");
    }

    #[test]
    fn test_compile_mysql_backslash_escape_in_string() {
        let params = Params::new().with("p", 2);
        let q = CompiledQuery::compile(r"select 'it\'s :no' , :p", &params, Dialect::MySql).unwrap();
        assert_eq!(q.sql(), r"select 'it\'s :no' , ?");
    }

    #[test]
    fn test_compile_missing_parameter_is_execution_error() {
        let err = CompiledQuery::compile("select :absent", &Params::new(), Dialect::MySql).unwrap_err();
        match err {
            StoreError::QueryExecution { message } => assert!(message.contains(":absent")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unused_parameters_are_ignored() {
        let params = Params::new().with("unused", 1);
        let q = CompiledQuery::compile("select 1", &params, Dialect::MySql).unwrap();
        assert_eq!(q.sql(), "select 1");
        assert!(q.values().is_empty());
    }

    #[test]
    fn test_granted_sentinel() {
        assert!(SqlValue::Int(1).is_granted());
        assert!(SqlValue::Bool(true).is_granted());
        assert!(!SqlValue::Int(0).is_granted());
        assert!(!SqlValue::Int(2).is_granted());
        assert!(!SqlValue::Null.is_granted());
        assert!(!SqlValue::Text("1".into()).is_granted());
    }

    #[test]
    fn test_insert_overwrites_existing_key() {
        let mut params = Params::new().with("offset", 99);
        let previous = params.insert("offset", 0);
        assert_eq!(previous, Some(SqlValue::Int(99)));
        assert_eq!(params.get("offset"), Some(&SqlValue::Int(0)));
    }
}
