use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::{
        schema::TableMeta,
        types::Value,
    },
};

/// One primary key column value
///
/// Besides concrete values a key may carry the sentinels wide-column stores
/// use for open range bounds and for store-assigned identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyValue {
    /// Sorts before every value
    Min,
    Value(Value),
    /// Ask the store to assign the next identifier on put
    AutoIncrement,
    /// Sorts after every value
    Max,
}

impl From<Value> for KeyValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Ordered primary key columns of a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey(pub Vec<(String, KeyValue)>);

impl PrimaryKey {
    pub fn new(columns: Vec<(String, KeyValue)>) -> Self {
        Self(columns)
    }

    /// Returns the concrete value of a key column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).and_then(|(_, v)| match v {
            KeyValue::Value(value) => Some(value),
            _ => None,
        })
    }

    /// Returns the key values, failing on any sentinel
    pub fn values(&self) -> Result<Vec<&Value>> {
        self.0
            .iter()
            .map(|(name, v)| match v {
                KeyValue::Value(value) => Ok(value),
                other => Err(Error::Store(format!(
                    "key column {} must be concrete, got {:?}",
                    name, other
                ))),
            })
            .collect()
    }
}

impl Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = self
            .0
            .iter()
            .map(|(name, v)| match v {
                KeyValue::Value(value) => format!("{}={}", name, value),
                other => format!("{}={:?}", name, other),
            })
            .collect::<Vec<_>>();
        write!(f, "({})", parts.join(", "))
    }
}

/// A row as the store returns it: key columns plus attribute columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub primary_key: PrimaryKey,
    pub attributes: Vec<(String, Value)>,
}

/// Range scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Row existence expectation for conditional writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Ignore,
    ExpectExist,
}

/// One page of a range scan
#[derive(Debug, Clone, PartialEq)]
pub struct RangePage {
    pub rows: Vec<StoreRow>,
    /// Where the next page starts; None once the range is exhausted
    pub next_start_key: Option<PrimaryKey>,
}

/// Store adapter - the primitive operations of a wide-column key-value store
///
/// Implementations wrap a network client or, for tests and embedding, the
/// in-process `MemoryStore`. Errors from the transport are returned as
/// `Error::Store` and never retried here. A store handle is used by one
/// session at a time; sharing it across threads needs external locking.
pub trait Store {
    /// Point lookup by full primary key
    fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<StoreRow>>;

    /// Ordered scan from `start` (inclusive) towards `end` (exclusive),
    /// returning one page
    fn get_range(
        &self,
        table: &str,
        direction: Direction,
        start: &PrimaryKey,
        end: &PrimaryKey,
    ) -> Result<RangePage>;

    /// Multi-key lookup; absent rows come back as None
    fn batch_get(&self, table: &str, keys: &[PrimaryKey])
    -> Result<Vec<(PrimaryKey, Option<StoreRow>)>>;

    /// Writes a whole row, returning its key with any auto-increment column filled in
    fn put(
        &mut self,
        table: &str,
        key: PrimaryKey,
        attributes: Vec<(String, Value)>,
    ) -> Result<PrimaryKey>;

    /// Overwrites the given attribute columns of a row
    fn update(
        &mut self,
        table: &str,
        key: &PrimaryKey,
        attributes: Vec<(String, Value)>,
        condition: Condition,
    ) -> Result<()>;

    fn delete(&mut self, table: &str, key: &PrimaryKey, condition: Condition) -> Result<()>;

    // Table lifecycle
    fn create_table(&mut self, meta: TableMeta) -> Result<()>;
    fn drop_table(&mut self, table: &str) -> Result<()>;
    fn describe_table(&self, table: &str) -> Result<TableMeta>;

    /// Whether `KeyValue::AutoIncrement` is honoured by `put`
    fn supports_auto_increment(&self) -> bool;

    /// Reads a whole range page by page, following `next_start_key`
    ///
    /// Pages are separate reads: rows written between two page requests may
    /// or may not be seen, so the result is not a snapshot of the range.
    fn scan(&self, table: &str, start: &PrimaryKey, end: &PrimaryKey) -> Result<Vec<StoreRow>> {
        let mut rows = Vec::new();
        let mut page = self.get_range(table, Direction::Forward, start, end)?;
        loop {
            rows.append(&mut page.rows);
            match page.next_start_key {
                Some(next) => page = self.get_range(table, Direction::Forward, &next, end)?,
                None => break,
            }
        }
        Ok(rows)
    }
}
