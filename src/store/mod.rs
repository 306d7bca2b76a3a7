pub mod dialect;
pub mod executor;
pub mod hiscore;
pub mod params;
pub mod result;
pub mod schema;
pub mod tokens;

pub use dialect::Dialect;
pub use executor::{ConnectionMode, Pagination, QueryExecutor, Statement, StoreConfig};
pub use params::{Params, SqlValue};
pub use result::{Record, ResultSet, RowMap};
