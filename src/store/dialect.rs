//! SQL dialect differences the executor has to care about: placeholder
//! syntax and the shape of the pagination clause.

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Derive the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, StoreError> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(StoreError::UnsupportedUrl(scheme)),
        }
    }

    /// Pagination suffix using the reserved `:offset` / `:row_count` markers.
    pub fn pagination_clause(self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Sqlite => "LIMIT :offset, :row_count",
            Dialect::Postgres => "LIMIT :row_count OFFSET :offset",
        }
    }

    /// Positional placeholder for the `n`-th distinct bound value (1-based).
    pub(crate) fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", n),
        }
    }

    /// Whether a repeated marker can reuse an earlier placeholder index.
    pub(crate) fn numbered_placeholders(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_schemes() {
        assert_eq!(Dialect::from_url("mysql://root@localhost/playerdata").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("mariadb://db/x").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("postgres://localhost/x").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("PostgreSQL://localhost/x").unwrap(), Dialect::Postgres);
    }

    #[test]
    fn test_from_url_rejects_unknown_scheme() {
        let err = Dialect::from_url("mssql://localhost").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedUrl(s) if s == "mssql"));
    }

    #[test]
    fn test_pagination_clause_mysql_style() {
        assert_eq!(Dialect::MySql.pagination_clause(), "LIMIT :offset, :row_count");
        assert_eq!(Dialect::Sqlite.pagination_clause(), "LIMIT :offset, :row_count");
    }

    #[test]
    fn test_pagination_clause_postgres() {
        assert_eq!(Dialect::Postgres.pagination_clause(), "LIMIT :row_count OFFSET :offset");
    }
}
