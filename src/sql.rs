//! SQL parsing utilities for validating statements and extracting table names.
//!
//! Table names are read from the sqlparser AST rather than from token positions,
//! so quoting, casing, joins and subqueries are handled by the parser.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart, Query, Statement, Visit, Visitor};
use sqlparser::parser::Parser;

use crate::engine::EngineFamily;

/// Returns true when `sql` holds at least one statement the family's dialect can parse.
///
/// A pass says nothing about whether the statement is semantically valid.
pub fn is_valid_sql(sql: &str, family: EngineFamily) -> bool {
    if sql.trim().is_empty() {
        return false;
    }
    let dialect = family.dialect();
    matches!(Parser::parse_sql(dialect.as_ref(), sql), Ok(statements) if !statements.is_empty())
}

/// A table name as written, with whether it was quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub quoted: bool,
}

impl TableRef {
    /// A name taken verbatim, as the operations quote caller-supplied names.
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }

    fn from_ident(ident: &Ident) -> Self {
        Self {
            name: ident.value.clone(),
            quoted: ident.quote_style.is_some(),
        }
    }

    /// Whether this reference resolves to the catalog entry `catalog_name`.
    pub fn matches(&self, catalog_name: &str, family: EngineFamily) -> bool {
        self.key(family) == family.normalize_identifier(catalog_name, true)
    }

    fn key(&self, family: EngineFamily) -> String {
        family.normalize_identifier(&self.name, self.quoted)
    }
}

/// A single parsed SQL statement.
pub struct ParsedStatement {
    statement: Statement,
    family: EngineFamily,
}

impl ParsedStatement {
    /// Parse a SQL statement.
    ///
    /// Returns `None` if the SQL cannot be parsed or contains more than one statement.
    pub fn parse(sql: &str, family: EngineFamily) -> Option<Self> {
        let dialect = family.dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), sql).ok()?;

        if statements.len() != 1 {
            return None;
        }

        Some(Self {
            statement: statements.into_iter().next()?,
            family,
        })
    }

    pub fn is_query(&self) -> bool {
        matches!(self.statement, Statement::Query(_))
    }

    /// Unqualified name of the table a `CREATE TABLE` statement creates.
    pub fn created_table_name(&self) -> Option<TableRef> {
        match &self.statement {
            Statement::CreateTable(create) => table_part(&create.name),
            _ => None,
        }
    }

    /// Unqualified names of the base tables a query reads, in first-seen order.
    ///
    /// Names bound by a `WITH` clause at any nesting level are not base tables
    /// and are skipped.
    pub fn referenced_tables(&self) -> Vec<TableRef> {
        let mut collector = RelationCollector {
            family: self.family,
            ctes: HashSet::new(),
            seen: HashSet::new(),
            tables: Vec::new(),
        };
        let _ = self.statement.visit(&mut collector);
        collector.tables
    }
}

/// Walks a statement in pre-order, so every `WITH` is seen before the
/// relations in its scope.
struct RelationCollector {
    family: EngineFamily,
    ctes: HashSet<String>,
    seen: HashSet<String>,
    tables: Vec<TableRef>,
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let name = TableRef::from_ident(&cte.alias.name);
                self.ctes.insert(name.key(self.family));
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let Some(table) = table_part(relation) {
            let key = table.key(self.family);
            if !self.ctes.contains(&key) && self.seen.insert(key) {
                self.tables.push(table);
            }
        }
        ControlFlow::Continue(())
    }
}

/// Last identifier of an object name: `public.users` becomes `users`.
fn table_part(obj_name: &ObjectName) -> Option<TableRef> {
    obj_name
        .0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(TableRef::from_ident(ident)),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .last()
}
