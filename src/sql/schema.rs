use serde::{Deserialize, Serialize};

use crate::{
    sql::types::{ColumnType, Value},
    storage::store::{KeyValue, PrimaryKey},
};

/// First key column of every base table: a constant partition discriminator
pub const PARTITION_COLUMN: &str = "_partition";
/// Second key column of every base table: the row identifier
pub const ID_COLUMN: &str = "id";

/// Table schema as the store describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    /// Ordered key columns
    pub primary_key: Vec<(String, ColumnType)>,
    /// Attribute columns declared at creation; rows may carry others
    pub defined_columns: Vec<(String, ColumnType)>,
}

impl TableMeta {
    /// Schema of a base table: `(_partition, id)` key plus declared attributes
    pub fn base_table(name: &str, defined_columns: Vec<(String, ColumnType)>) -> Self {
        Self {
            name: name.to_string(),
            primary_key: vec![
                (PARTITION_COLUMN.to_string(), ColumnType::Integer),
                (ID_COLUMN.to_string(), ColumnType::Integer),
            ],
            defined_columns,
        }
    }

    /// Schema of the index table for `column`: `(column, _partition, id)` key
    pub fn index_table(name: &str, column: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            primary_key: vec![
                (column.to_string(), column_type),
                (PARTITION_COLUMN.to_string(), ColumnType::Integer),
                (ID_COLUMN.to_string(), ColumnType::Integer),
            ],
            defined_columns: Vec::new(),
        }
    }

    /// All columns in key-then-attribute order
    pub fn columns(&self) -> impl Iterator<Item = &(String, ColumnType)> {
        self.primary_key.iter().chain(self.defined_columns.iter())
    }
}

/// Key-space conventions shared by the planner, executors and fallback engine
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLayout {
    pub partition: i64,
    pub index_prefix: String,
}

impl KeyLayout {
    pub fn new(partition: i64, index_prefix: &str) -> Self {
        Self {
            partition,
            index_prefix: index_prefix.to_string(),
        }
    }

    fn partition(&self) -> (String, KeyValue) {
        (PARTITION_COLUMN.to_string(), Value::Integer(self.partition).into())
    }

    /// Base table key with the given identifier slot
    pub fn row_key(&self, id: KeyValue) -> PrimaryKey {
        PrimaryKey::new(vec![self.partition(), (ID_COLUMN.to_string(), id)])
    }

    /// Index table key for one indexed value and identifier slot
    pub fn index_key(&self, column: &str, value: &Value, id: KeyValue) -> PrimaryKey {
        PrimaryKey::new(vec![
            (column.to_string(), value.clone().into()),
            self.partition(),
            (ID_COLUMN.to_string(), id),
        ])
    }

    /// Index table name: `<prefix>_<table>_<column>`
    pub fn index_table_name(&self, table: &str, column: &str) -> String {
        format!("{}_{}_{}", self.index_prefix, table, column)
    }
}
