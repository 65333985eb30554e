//! Table-level operations over a single backend handle.
//!
//! Every operation validates its inputs locally, re-checks table existence
//! against the database (nothing is cached), then delegates one call to the
//! [`Backend`]. Operations are not atomic with respect to each other.

use tracing::{error, info, instrument, warn};

use crate::backend::Backend;
use crate::engine::{ConnectionParams, ConnectionUrl, EngineFamily};
use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, DataType, Schema, TableDefinition};
use crate::sql::{self, ParsedStatement, TableRef};
use crate::sqlite::SqliteBackend;
use crate::table::{Table, TableMapping, TabularData};
use crate::value::Value;

/// How [`DbTableOps::query_to_table`] shapes its result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Columns moved into the row index.
    pub index_columns: Vec<String>,
    /// Return `{column -> {row key -> value}}` instead of a [`Table`].
    pub as_mapping: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_col(mut self, column: impl Into<String>) -> Self {
        self.index_columns.push(column.into());
        self
    }

    pub fn as_mapping(mut self) -> Self {
        self.as_mapping = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Table(Table),
    Mapping(TableMapping),
}

impl QueryOutput {
    pub fn into_table(self) -> Option<Table> {
        match self {
            QueryOutput::Table(table) => Some(table),
            QueryOutput::Mapping(_) => None,
        }
    }

    pub fn into_mapping(self) -> Option<TableMapping> {
        match self {
            QueryOutput::Table(table) => Some(table.to_mapping()),
            QueryOutput::Mapping(mapping) => Some(mapping),
        }
    }
}

/// Validated table operations for one database.
pub struct DbTableOps {
    family: EngineFamily,
    database: String,
    url: ConnectionUrl,
    backend: Box<dyn Backend>,
}

impl DbTableOps {
    /// Connect with the built-in driver for the engine family.
    ///
    /// Only SQLite has a built-in driver; other families need
    /// [`DbTableOps::with_backend`]. A failing connection test is logged, not
    /// returned; call [`DbTableOps::ping`] to check it.
    pub fn new(params: ConnectionParams) -> Result<Self> {
        let family = params.family()?;
        let backend: Box<dyn Backend> = match family {
            EngineFamily::Sqlite if params.is_in_memory() => {
                Box::new(SqliteBackend::open_in_memory()?)
            }
            EngineFamily::Sqlite => Box::new(SqliteBackend::open(&params.database)?),
            other => {
                return Err(Error::UnsupportedEngine(format!(
                    "no built-in driver for {other}, supply one with DbTableOps::with_backend"
                )))
            }
        };
        Ok(Self::assemble(params, family, backend))
    }

    /// Use a caller-supplied backend speaking the dialect of `params.engine_type`.
    pub fn with_backend(params: ConnectionParams, backend: impl Backend + 'static) -> Result<Self> {
        let family = params.family()?;
        Ok(Self::assemble(params, family, Box::new(backend)))
    }

    fn assemble(params: ConnectionParams, family: EngineFamily, backend: Box<dyn Backend>) -> Self {
        let url = params.url();
        info!(%url, "database engine connection string created");

        let ops = Self {
            family,
            database: params.database,
            url,
            backend,
        };
        match ops.ping() {
            Ok(()) => info!("database connection established and working"),
            Err(err) => error!(error = %err, "error while connecting to database"),
        }
        ops
    }

    pub fn family(&self) -> EngineFamily {
        self.family
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn url(&self) -> &ConnectionUrl {
        &self.url
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Round trip to the database.
    pub fn ping(&self) -> Result<()> {
        self.backend.ping()
    }

    /// Syntax check with the parser dialect of this engine family.
    pub fn is_valid_sql(&self, sql: &str) -> bool {
        sql::is_valid_sql(sql, self.family)
    }

    /// Whether the table exists, compared the way the engine resolves names.
    #[instrument(skip(self))]
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        check_table_name(table_name)?;
        self.has_table(&TableRef::exact(table_name))
    }

    /// All tables in the database, also written to the log.
    #[instrument(skip(self))]
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.table_names()?;
        info!(database = %self.database, count = tables.len(), "table list");
        for (idx, table) in tables.iter().enumerate() {
            info!("{idx}. {table}");
        }
        Ok(tables)
    }

    /// Runs a `CREATE TABLE` statement unless the table already exists.
    ///
    /// Returns whether the table was created.
    #[instrument(skip_all)]
    pub fn create_table_from_sql(&self, ddl: &str) -> Result<bool> {
        self.check_sql(ddl)?;
        let table = ParsedStatement::parse(ddl, self.family)
            .and_then(|parsed| parsed.created_table_name())
            .ok_or_else(|| {
                Error::InvalidSqlQuery("expected a single CREATE TABLE statement".into())
            })?;
        check_table_name(&table.name)?;

        if self.has_table(&table)? {
            info!(table = %table.name, database = %self.database, "table already exists");
            return Ok(false);
        }

        self.backend.execute(ddl, &[])?;
        info!(table = %table.name, database = %self.database, "table created");
        Ok(true)
    }

    /// Creates one table registered in `base` unless it already exists.
    pub fn create_table_from_model(&self, base: &Schema, table: &TableDefinition) -> Result<bool> {
        self.create_tables_from_models(base, &[table])
            .map(|created| !created.is_empty())
    }

    /// Creates every missing table among `tables`; all must be registered in `base`.
    ///
    /// Returns the names of the tables that were created.
    #[instrument(skip_all)]
    pub fn create_tables_from_models(
        &self,
        base: &Schema,
        tables: &[&TableDefinition],
    ) -> Result<Vec<String>> {
        if base.tables.is_empty() {
            return Err(Error::InvalidBaseOrm(
                "base metadata has no registered tables".into(),
            ));
        }
        if tables.is_empty() {
            return Err(Error::InvalidTableOrm(
                "expected at least one table definition".into(),
            ));
        }
        for table in tables {
            check_table_name(&table.name)?;
            if table.columns.is_empty() {
                return Err(Error::InvalidTableOrm(format!(
                    "table {} has no columns",
                    table.name
                )));
            }
            if !base.contains(table) {
                return Err(Error::InvalidBaseOrm(format!(
                    "table {} is not registered with the base metadata",
                    table.name
                )));
            }
        }

        let mut created = Vec::new();
        for table in tables {
            if self.table_exists(&table.name)? {
                info!(table = %table.name, database = %self.database, "table already exists");
                continue;
            }
            self.create_from_definition(table)?;
            created.push(table.name.clone());
        }
        Ok(created)
    }

    /// Drops the table if it exists. A missing table is a silent no-op.
    ///
    /// Returns whether a table was dropped.
    #[instrument(skip(self))]
    pub fn delete_table(&self, table_name: &str) -> Result<bool> {
        check_table_name(table_name)?;
        if !self.table_exists(table_name)? {
            return Ok(false);
        }

        let statement = format!("DROP TABLE {}", self.family.quote_identifier(table_name));
        self.check_generated(&statement)?;
        self.backend.execute(&statement, &[])?;
        info!(table = table_name, database = %self.database, "table deleted");
        Ok(true)
    }

    /// [`DbTableOps::delete_table`] for each name; returns the names that were dropped.
    pub fn delete_tables<I, S>(&self, table_names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dropped = Vec::new();
        for name in table_names {
            let name = name.as_ref();
            if self.delete_table(name)? {
                dropped.push(name.to_string());
            }
        }
        Ok(dropped)
    }

    /// Appends every row of `data`, matching columns by name.
    ///
    /// A missing table is created from the column types of the data, with a warning.
    /// Returns the number of inserted rows.
    #[instrument(skip(self, data))]
    pub fn insert_dataframe(&self, table_name: &str, data: impl Into<TabularData>) -> Result<usize> {
        check_table_name(table_name)?;
        let table = data.into().into_table()?;

        if !self.table_exists(table_name)? {
            warn!(table = table_name, "table does not exist in database, creating a new table");
            self.create_from_definition(&inferred_definition(table_name, &table))?;
        }

        let statement = self.insert_statement(table_name, table.columns())?;
        let inserted = self.backend.execute_many(&statement, table.rows())?;
        info!(
            table = table_name,
            database = %self.database,
            rows = inserted,
            "dataframe inserted"
        );
        Ok(inserted)
    }

    /// Inserts one row with every value bound as a parameter.
    #[instrument(skip(self, columns, values))]
    pub fn insert_row<S: AsRef<str>>(
        &self,
        table_name: &str,
        columns: &[S],
        values: &[Value],
    ) -> Result<()> {
        check_table_name(table_name)?;
        if columns.is_empty() || columns.len() != values.len() {
            return Err(Error::ColumnValueMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let statement = self.insert_statement(table_name, columns)?;
        if !self.table_exists(table_name)? {
            return Err(self.missing_table(table_name));
        }

        self.backend.execute(&statement, values)?;
        info!(table = table_name, database = %self.database, "row inserted");
        Ok(())
    }

    /// Runs a query after checking that every table it reads exists.
    #[instrument(skip(self, options))]
    pub fn query_to_table(&self, query: &str, options: &QueryOptions) -> Result<QueryOutput> {
        let table = self.read_query(query)?.set_index(&options.index_columns)?;
        Ok(if options.as_mapping {
            if let Some(column) = table.duplicate_column() {
                return Err(Error::ShapeMismatch(format!(
                    "column {column} appears more than once, alias it to build a mapping"
                )));
            }
            QueryOutput::Mapping(table.to_mapping())
        } else {
            QueryOutput::Table(table)
        })
    }

    /// [`DbTableOps::query_to_table`] without index or mapping.
    #[instrument(skip(self))]
    pub fn query_table(&self, query: &str) -> Result<Table> {
        self.read_query(query)
    }

    /// Executes any statement and returns the rows of its result set.
    ///
    /// A statement without a result set still runs, then fails with [`Error::NoResultSet`].
    #[instrument(skip(self))]
    pub fn run_raw_sql(&self, query: &str) -> Result<Vec<Vec<Value>>> {
        self.check_sql(query)?;
        let result = self.backend.query(query, &[])?;
        if !result.has_result_set() {
            return Err(Error::NoResultSet);
        }
        Ok(result.rows)
    }

    fn read_query(&self, query: &str) -> Result<Table> {
        self.check_sql(query)?;
        let parsed = ParsedStatement::parse(query, self.family)
            .filter(ParsedStatement::is_query)
            .ok_or_else(|| Error::InvalidSqlQuery("expected a single query statement".into()))?;

        let tables = parsed.referenced_tables();
        if tables.is_empty() {
            return Err(Error::InvalidSqlQuery(
                "query does not read from a table".into(),
            ));
        }
        let existing = self.table_names()?;
        if let Some(missing) = tables
            .iter()
            .find(|table| !existing.iter().any(|name| table.matches(name, self.family)))
        {
            return Err(self.missing_table(&missing.name));
        }

        let result = self.backend.query(query, &[]).map_err(|err| {
            error!(error = %err, "error reading table");
            err
        })?;
        Table::new(result.columns, result.rows)
    }

    fn has_table(&self, table: &TableRef) -> Result<bool> {
        Ok(self
            .table_names()?
            .iter()
            .any(|name| table.matches(name, self.family)))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let result = self.backend.query(self.family.list_tables_sql(), &[])?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    fn create_from_definition(&self, table: &TableDefinition) -> Result<()> {
        for statement in table.to_ddl(self.family) {
            self.check_generated(&statement)?;
            self.backend.execute(&statement, &[])?;
        }
        info!(table = %table.name, database = %self.database, "table created");
        Ok(())
    }

    fn insert_statement<S: AsRef<str>>(&self, table_name: &str, columns: &[S]) -> Result<String> {
        let mut quoted = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            if column.trim().is_empty() {
                return Err(Error::InvalidSqlQuery("column name is empty".into()));
            }
            quoted.push(self.family.quote_identifier(column));
        }

        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.family.quote_identifier(table_name),
            quoted.join(", "),
            self.family.placeholders(columns.len())
        );
        self.check_generated(&statement)?;
        Ok(statement)
    }

    fn check_sql(&self, sql: &str) -> Result<()> {
        if sql.trim().is_empty() {
            return Err(Error::InvalidSqlQuery("SQL string is empty".into()));
        }
        if !self.is_valid_sql(sql) {
            return Err(Error::InvalidSqlQuery(
                "SQL string is not a valid SQL query".into(),
            ));
        }
        Ok(())
    }

    fn check_generated(&self, statement: &str) -> Result<()> {
        if self.is_valid_sql(statement) {
            Ok(())
        } else {
            Err(Error::InvalidSqlQuery(format!(
                "generated statement is not valid SQL: {statement}"
            )))
        }
    }

    fn missing_table(&self, table_name: &str) -> Error {
        Error::InvalidTableName(format!(
            "table {table_name} does not exist in database {}",
            self.database
        ))
    }
}

fn check_table_name(table_name: &str) -> Result<()> {
    if table_name.trim().is_empty() {
        return Err(Error::InvalidTableName("table name is empty".into()));
    }
    Ok(())
}

/// Column types come from the first non-null value of each column; all-null columns are text.
fn inferred_definition(table_name: &str, table: &Table) -> TableDefinition {
    table
        .columns()
        .iter()
        .enumerate()
        .fold(TableDefinition::new(table_name), |def, (c, name)| {
            let data_type = table
                .rows()
                .iter()
                .find_map(|row| DataType::infer(&row[c]))
                .unwrap_or(DataType::Text);
            def.column(ColumnDefinition::new(name.clone(), data_type))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_ops() -> DbTableOps {
        DbTableOps::new(ConnectionParams::sqlite(":memory:")).unwrap()
    }

    #[test]
    fn non_sqlite_families_need_a_backend() {
        let params = ConnectionParams {
            engine_type: "postgresql".into(),
            ..Default::default()
        };
        assert!(matches!(
            DbTableOps::new(params),
            Err(Error::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn empty_table_names_are_rejected_everywhere() {
        let ops = memory_ops();
        assert!(matches!(ops.table_exists(""), Err(Error::InvalidTableName(_))));
        assert!(matches!(ops.delete_table("  "), Err(Error::InvalidTableName(_))));
        assert!(matches!(
            ops.insert_row("", &["a"], &[Value::Null]),
            Err(Error::InvalidTableName(_))
        ));
        let mut map = crate::table::ColumnMap::new();
        map.insert("a".into(), vec![1.into()]);
        assert!(matches!(
            ops.insert_dataframe("", map),
            Err(Error::InvalidTableName(_))
        ));
    }

    #[test]
    fn create_from_sql_requires_create_table() {
        let ops = memory_ops();
        assert!(matches!(
            ops.create_table_from_sql("SELECT 1"),
            Err(Error::InvalidSqlQuery(_))
        ));
        assert!(matches!(
            ops.create_table_from_sql(""),
            Err(Error::InvalidSqlQuery(_))
        ));
    }

    #[test]
    fn inferred_definition_uses_first_non_null_value() {
        let table = Table::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Value::Null, Value::Real(1.5), Value::Null],
                vec![Value::Integer(3), Value::Null, Value::Null],
            ],
        )
        .unwrap();
        let def = inferred_definition("t", &table);
        let types: Vec<DataType> = def.columns.iter().map(|c| c.data_type).collect();
        assert_eq!(types, vec![DataType::Integer, DataType::Real, DataType::Text]);
    }

    #[test]
    fn query_options_builder() {
        let options = QueryOptions::new().index_col("id").as_mapping();
        assert_eq!(options.index_columns, vec!["id".to_string()]);
        assert!(options.as_mapping);
    }
}
