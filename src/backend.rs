use crate::error::Result;
use crate::value::Value;

/// Rows returned by a statement, with the column names of its result set.
///
/// A statement that produces no result set has no columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn has_result_set(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// The database client a [`crate::DbTableOps`] delegates to.
///
/// Parameters are bound positionally in the placeholder style of the backend's
/// engine family.
pub trait Backend {
    /// Execute one statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Execute one statement once per parameter row, all in a single transaction.
    fn execute_many(&self, sql: &str, rows: &[Vec<Value>]) -> Result<usize>;

    /// Execute one statement and collect every row it returns.
    fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Cheap round trip used to test the connection.
    fn ping(&self) -> Result<()>;
}
