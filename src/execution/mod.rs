//! Execution Module - read-only SQL guard and the standardized query result

pub mod result;
pub mod sql_guard;

pub use result::QueryResult;
pub use sql_guard::ensure_read_only;
