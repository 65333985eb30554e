//! Declarative table definitions and their DDL rendering.

use crate::engine::EngineFamily;
use crate::value::Value;

/// Base metadata: the registry of table definitions a wrapper may create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    /// Register the definition declared by a [`TableModel`].
    pub fn with_model<M: TableModel>(self) -> Self {
        self.add_table(M::table_definition())
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, table: &TableDefinition) -> bool {
        self.table(&table.name) == Some(table)
    }
}

/// A type that declares the table it is stored in.
pub trait TableModel {
    fn table_definition() -> TableDefinition;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Renders the `CREATE TABLE` statement followed by one `CREATE INDEX` per index.
    pub fn to_ddl(&self, family: EngineFamily) -> Vec<String> {
        let q = |ident: &String| family.quote_identifier(ident);
        let join = |cols: &[String]| cols.iter().map(q).collect::<Vec<_>>().join(", ");

        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.to_sql(family))
            .collect();

        if !self.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", join(&self.primary_key)));
        }

        for fk in &self.foreign_keys {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
                q(&fk.column),
                q(&fk.foreign_table),
                q(&fk.foreign_column),
                fk.on_delete.as_sql(),
                fk.on_update.as_sql(),
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            q(&self.name),
            parts.join(", ")
        )];

        for index in &self.indexes {
            statements.push(format!(
                "CREATE {}INDEX {} ON {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                q(&index.name),
                q(&self.name),
                join(&index.columns),
            ));
        }
        statements
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    fn to_sql(&self, family: EngineFamily) -> String {
        let mut sql = format!(
            "{} {}",
            family.quote_identifier(&self.name),
            self.data_type.sql_name(family)
        );
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.as_sql());
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
    Boolean,
    Varchar(u32),
}

impl DataType {
    /// Storage type for a value, used when a table is created from data.
    pub fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Integer(_) => Some(DataType::Integer),
            Value::Real(_) => Some(DataType::Real),
            Value::Text(_) => Some(DataType::Text),
            Value::Blob(_) => Some(DataType::Blob),
            Value::Boolean(_) => Some(DataType::Boolean),
        }
    }

    pub fn sql_name(&self, family: EngineFamily) -> String {
        use EngineFamily::*;
        match (self, family) {
            (DataType::Varchar(n), Oracle) => format!("VARCHAR2({n})"),
            (DataType::Varchar(n), _) => format!("VARCHAR({n})"),
            (DataType::Integer, MsSql) => "BIGINT".into(),
            (DataType::Integer, Oracle) => "NUMBER(19)".into(),
            (DataType::Integer, _) => "INTEGER".into(),
            (DataType::Text, MsSql) => "NVARCHAR(MAX)".into(),
            (DataType::Text, Oracle) => "CLOB".into(),
            (DataType::Text, _) => "TEXT".into(),
            (DataType::Real, MySql) => "DOUBLE".into(),
            (DataType::Real, MsSql) => "FLOAT".into(),
            (DataType::Real, PostgreSql) => "DOUBLE PRECISION".into(),
            (DataType::Real, Oracle) => "BINARY_DOUBLE".into(),
            (DataType::Real, Sqlite) => "REAL".into(),
            (DataType::Blob, PostgreSql) => "BYTEA".into(),
            (DataType::Blob, MsSql) => "VARBINARY(MAX)".into(),
            (DataType::Blob, _) => "BLOB".into(),
            (DataType::Boolean, MsSql) => "BIT".into(),
            (DataType::Boolean, Oracle) => "NUMBER(1)".into(),
            (DataType::Boolean, _) => "BOOLEAN".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

impl ColumnConstraint {
    fn as_sql(&self) -> &'static str {
        match self {
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::Unique => "UNIQUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

impl DefaultValue {
    // DDL cannot take bound parameters, so text defaults are escaped literals.
    fn to_sql(&self) -> String {
        match self {
            DefaultValue::Integer(v) => v.to_string(),
            DefaultValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
            DefaultValue::Real(v) => v.to_string(),
            DefaultValue::Null => "NULL".into(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}
