use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid table name: {0}")]
    InvalidTableName(String),
    #[error("invalid sql query: {0}")]
    InvalidSqlQuery(String),
    #[error("invalid base metadata: {0}")]
    InvalidBaseOrm(String),
    #[error("invalid table definition: {0}")]
    InvalidTableOrm(String),
    #[error("dataframe or mapping is empty")]
    EmptyDataframeDict,
    #[error("column/value mismatch: {columns} columns, {values} values")]
    ColumnValueMismatch { columns: usize, values: usize },
    #[error("tabular data is not rectangular: {0}")]
    ShapeMismatch(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("statement did not produce a result set")]
    NoResultSet,
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
