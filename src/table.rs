//! In-memory tabular structure used for bulk inserts and query results.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::value::Value;

/// Column name to column values, the mapping form of tabular input.
pub type ColumnMap = BTreeMap<String, Vec<Value>>;

/// Column name to `{row key -> value}`, the mapping form of a query result.
pub type TableMapping = BTreeMap<String, BTreeMap<RowKey, Value>>;

/// Key of a row in [`TableMapping`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKey {
    /// Zero-based row position, used when no index is set.
    Position(usize),
    /// Rendered index values; a multi-column index renders as `(a, b)`.
    Label(String),
}

/// Rectangular data with named columns and ordered rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: Option<Index>,
}

#[derive(Debug, Clone, PartialEq)]
struct Index {
    names: Vec<String>,
    labels: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table; every row must have one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(Error::ShapeMismatch(format!(
                "row {i} has {} values for {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
            index: None,
        })
    }

    /// Builds a table from equally long columns, ordered by column name.
    pub fn from_columns(map: ColumnMap) -> Result<Self> {
        let height = map.values().next().map_or(0, Vec::len);
        if let Some((name, values)) = map.iter().find(|(_, v)| v.len() != height) {
            return Err(Error::ShapeMismatch(format!(
                "column {name} has {} values, expected {height}",
                values.len()
            )));
        }

        let columns: Vec<String> = map.keys().cloned().collect();
        let mut rows: Vec<Vec<Value>> = (0..height)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for values in map.into_values() {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(Self {
            columns,
            rows,
            index: None,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn index_names(&self) -> &[String] {
        match &self.index {
            Some(index) => &index.names,
            None => &[],
        }
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[pos]).collect())
    }

    /// Moves the named columns out of the data and into the row index.
    pub fn set_index<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let pos = self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
            positions.push(pos);
        }

        let labels = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
            .collect();

        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !positions.contains(i))
            .collect();
        let pick = |values: &[String]| -> Vec<String> {
            keep.iter().map(|&i| values[i].clone()).collect()
        };
        let index_names: Vec<String> = positions.iter().map(|&p| self.columns[p].clone()).collect();
        self.columns = pick(&self.columns);
        self.rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();
        self.index = Some(Index {
            names: index_names,
            labels,
        });
        Ok(self)
    }

    pub fn row_keys(&self) -> Vec<RowKey> {
        match &self.index {
            None => (0..self.rows.len()).map(RowKey::Position).collect(),
            Some(index) => index
                .labels
                .iter()
                .map(|label| match label.as_slice() {
                    [single] => RowKey::Label(single.to_string()),
                    many => RowKey::Label(format!(
                        "({})",
                        many.iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                })
                .collect(),
        }
    }

    /// First column name that appears more than once, as in `SELECT a.id, b.id`.
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .find(|name| !seen.insert(name.as_str()))
            .map(String::as_str)
    }

    /// `{column -> {row key -> value}}`.
    ///
    /// Duplicate index labels keep the last row and duplicate column names keep
    /// the last column; see [`Table::duplicate_column`].
    pub fn to_mapping(&self) -> TableMapping {
        let keys = self.row_keys();
        self.columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let cells = keys
                    .iter()
                    .cloned()
                    .zip(self.rows.iter().map(|row| row[c].clone()))
                    .collect();
                (name.clone(), cells)
            })
            .collect()
    }
}

/// Input accepted by bulk inserts: a table or a column mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum TabularData {
    Table(Table),
    Mapping(ColumnMap),
}

impl TabularData {
    /// Coerces the input into a non-empty table.
    pub fn into_table(self) -> Result<Table> {
        let table = match self {
            TabularData::Mapping(map) if map.is_empty() => return Err(Error::EmptyDataframeDict),
            TabularData::Mapping(map) => Table::from_columns(map)?,
            TabularData::Table(table) => table,
        };
        if table.is_empty() {
            return Err(Error::EmptyDataframeDict);
        }
        Ok(table)
    }
}

impl From<Table> for TabularData {
    fn from(table: Table) -> Self {
        TabularData::Table(table)
    }
}

impl From<ColumnMap> for TabularData {
    fn from(map: ColumnMap) -> Self {
        TabularData::Mapping(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["id".into(), "name".into(), "city".into()],
            vec![
                vec![Value::Integer(2), "Mariya".into(), "Mumbai".into()],
                vec![Value::Integer(10), "Zohair".into(), "Pune".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Table::new(vec!["a".into()], vec![vec![Value::Null, Value::Null]]);
        assert!(matches!(err, Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn from_columns_orders_by_name() {
        let mut map = ColumnMap::new();
        map.insert("b".into(), vec![1.into(), 2.into()]);
        map.insert("a".into(), vec!["x".into(), "y".into()]);
        let table = Table::from_columns(map).unwrap();
        assert_eq!(table.columns(), ["a", "b"]);
        assert_eq!(table.rows()[1], vec![Value::from("y"), Value::from(2)]);
    }

    #[test]
    fn from_columns_rejects_ragged_columns() {
        let mut map = ColumnMap::new();
        map.insert("a".into(), vec![1.into()]);
        map.insert("b".into(), vec![]);
        assert!(matches!(
            Table::from_columns(map),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(
            TabularData::from(ColumnMap::new()).into_table(),
            Err(Error::EmptyDataframeDict)
        ));
        let no_rows = Table::new(vec!["a".into()], vec![]).unwrap();
        assert!(matches!(
            TabularData::from(no_rows).into_table(),
            Err(Error::EmptyDataframeDict)
        ));
        let mut map = ColumnMap::new();
        map.insert("a".into(), vec![]);
        assert!(matches!(
            TabularData::from(map).into_table(),
            Err(Error::EmptyDataframeDict)
        ));
    }

    #[test]
    fn mapping_uses_positions_without_index() {
        let mapping = sample().to_mapping();
        assert_eq!(
            mapping["name"].get(&RowKey::Position(1)),
            Some(&Value::from("Zohair"))
        );
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn set_index_moves_columns_into_labels() {
        let table = sample().set_index(&["id"]).unwrap();
        assert_eq!(table.columns(), ["name", "city"]);
        assert_eq!(table.index_names(), ["id"]);
        let mapping = table.to_mapping();
        assert!(!mapping.contains_key("id"));
        assert_eq!(
            mapping["city"].get(&RowKey::Label("10".into())),
            Some(&Value::from("Pune"))
        );
    }

    #[test]
    fn multi_column_index_labels() {
        let table = sample().set_index(&["id", "city"]).unwrap();
        assert_eq!(
            table.row_keys(),
            vec![
                RowKey::Label("(2, Mumbai)".into()),
                RowKey::Label("(10, Pune)".into())
            ]
        );
    }

    #[test]
    fn duplicate_column_names_are_reported() {
        assert_eq!(sample().duplicate_column(), None);
        let table = Table::new(
            vec!["id".into(), "name".into(), "id".into()],
            vec![vec![Value::Integer(1), Value::from("a"), Value::Integer(7)]],
        )
        .unwrap();
        assert_eq!(table.duplicate_column(), Some("id"));
    }

    #[test]
    fn set_index_rejects_unknown_columns() {
        assert!(matches!(
            sample().set_index(&["missing"]),
            Err(Error::UnknownColumn(name)) if name == "missing"
        ));
    }
}
