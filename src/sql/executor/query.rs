use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        codec,
        executor::ResultSet,
        parser::ast::OrderDirection,
        schema::{ID_COLUMN, PARTITION_COLUMN},
        types::Value,
    },
    storage::{
        keycode,
        store::{PrimaryKey, Store},
    },
};

use super::Executor;

/// Full table scan executor (SELECT without a predicate)
pub struct Scan {
    table_name: String,
    start: PrimaryKey,
    end: PrimaryKey,
}

impl Scan {
    pub fn new(table_name: String, start: PrimaryKey, end: PrimaryKey) -> Box<Self> {
        Box::new(Self {
            table_name,
            start,
            end,
        })
    }
}

impl<S: Store> Executor<S> for Scan {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let rows = store.scan(&self.table_name, &self.start, &self.end)?;
        debug!(table = %self.table_name, rows = rows.len(), "full scan");
        Ok(ResultSet::from_records(
            rows.into_iter().map(codec::decode_row).collect(),
        ))
    }
}

/// Point get executor
pub struct KeyLookup {
    table_name: String,
    key: PrimaryKey,
}

impl KeyLookup {
    pub fn new(table_name: String, key: PrimaryKey) -> Box<Self> {
        Box::new(Self { table_name, key })
    }
}

impl<S: Store> Executor<S> for KeyLookup {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let row = store.get(&self.table_name, &self.key)?;
        Ok(ResultSet::from_records(
            row.into_iter().map(codec::decode_row).collect(),
        ))
    }
}

/// Batch get executor
///
/// Rows come back in whatever order the store returns them, which is not
/// necessarily the order of the requested keys. Missing rows are dropped.
pub struct BatchKeyLookup {
    table_name: String,
    keys: Vec<PrimaryKey>,
}

impl BatchKeyLookup {
    pub fn new(table_name: String, keys: Vec<PrimaryKey>) -> Box<Self> {
        Box::new(Self { table_name, keys })
    }
}

impl<S: Store> Executor<S> for BatchKeyLookup {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let rows = store.batch_get(&self.table_name, &self.keys)?;
        Ok(ResultSet::from_records(
            rows.into_iter()
                .filter_map(|(_, row)| row)
                .map(codec::decode_row)
                .collect(),
        ))
    }
}

/// Index scan executor
///
/// Scans the index table once per looked-up value, then fetches the base rows
/// the index entries point at. Results follow index order. An index entry
/// whose base row no longer exists is skipped.
pub struct IndexScan {
    table_name: String,
    index_table: String,
    ranges: Vec<(PrimaryKey, PrimaryKey)>,
}

impl IndexScan {
    pub fn new(
        table_name: String,
        index_table: String,
        ranges: Vec<(PrimaryKey, PrimaryKey)>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            index_table,
            ranges,
        })
    }
}

impl<S: Store> Executor<S> for IndexScan {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let mut keys = Vec::new();
        for (start, end) in &self.ranges {
            for entry in store.scan(&self.index_table, start, end)? {
                // Base key: the index key minus its leading indexed column
                keys.push(PrimaryKey::new(
                    entry
                        .primary_key
                        .0
                        .into_iter()
                        .filter(|(c, _)| c == PARTITION_COLUMN || c == ID_COLUMN)
                        .collect(),
                ));
            }
        }
        if keys.is_empty() {
            return Ok(ResultSet::from_records(Vec::new()));
        }

        let mut found = HashMap::new();
        for (key, row) in store.batch_get(&self.table_name, &keys)? {
            if let Some(row) = row {
                found.insert(keycode::serialize_key(&key)?, row);
            }
        }

        let mut records = Vec::with_capacity(found.len());
        for key in &keys {
            match found.remove(&keycode::serialize_key(key)?) {
                Some(row) => records.push(codec::decode_row(row)),
                None => debug!(index = %self.index_table, %key, "stale index entry skipped"),
            }
        }
        Ok(ResultSet::from_records(records))
    }
}

/// ORDER BY executor - stable in-memory sort on one column
///
/// Nulls sort lowest: first ascending, last descending. A column holding
/// several value types sorts by type rank first (see `Value::sort_cmp`).
/// Ordering by a column no row has leaves the rows as they are.
pub struct Order<S: Store> {
    source: Box<dyn Executor<S>>,
    column: String,
    direction: OrderDirection,
}

impl<S: Store> Order<S> {
    pub fn new(source: Box<dyn Executor<S>>, column: String, direction: OrderDirection) -> Box<Self> {
        Box::new(Self {
            source,
            column,
            direction,
        })
    }
}

impl<S: Store> Executor<S> for Order<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, mut rows } => {
                if let Some(i) = columns.iter().position(|c| *c == self.column) {
                    rows.sort_by(|a, b| {
                        let ordering = a[i].sort_cmp(&b[i]);
                        match self.direction {
                            OrderDirection::Asc => ordering,
                            OrderDirection::Desc => ordering.reverse(),
                        }
                    });
                }
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit<S: Store> {
    source: Box<dyn Executor<S>>,
    limit: usize,
}

impl<S: Store> Limit<S> {
    pub fn new(source: Box<dyn Executor<S>>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl<S: Store> Executor<S> for Limit<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => Ok(ResultSet::Scan {
                columns,
                rows: rows.into_iter().take(self.limit).collect(),
            }),
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Projection executor - picks the requested columns, Null where a row lacks one
pub struct Projection<S: Store> {
    source: Box<dyn Executor<S>>,
    columns: Vec<String>,
}

impl<S: Store> Projection<S> {
    pub fn new(source: Box<dyn Executor<S>>, columns: Vec<String>) -> Box<Self> {
        Box::new(Self { source, columns })
    }
}

impl<S: Store> Executor<S> for Projection<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => {
                let positions = self
                    .columns
                    .iter()
                    .map(|c| columns.iter().position(|s| s == c))
                    .collect::<Vec<_>>();
                let rows = rows
                    .into_iter()
                    .map(|row| {
                        positions
                            .iter()
                            .map(|p| p.map_or(Value::Null, |i| row[i].clone()))
                            .collect()
                    })
                    .collect();
                Ok(ResultSet::Scan {
                    columns: self.columns,
                    rows,
                })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}
