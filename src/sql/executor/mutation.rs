use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        codec,
        executor::{Executor, ResultSet},
        schema::ID_COLUMN,
        types::Value,
    },
    storage::store::{Condition, PrimaryKey, Store},
};

/// INSERT executor
pub struct Insert {
    table_name: String,
    key: PrimaryKey,
    columns: Vec<(String, Value)>,
}

impl Insert {
    pub fn new(table_name: String, key: PrimaryKey, columns: Vec<(String, Value)>) -> Box<Self> {
        Box::new(Self {
            table_name,
            key,
            columns,
        })
    }
}

impl<S: Store> Executor<S> for Insert {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        // Null parameters are left out of the row instead of stored as explicit nulls
        let attributes = self
            .columns
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(c, v)| (c, codec::encode_value(v)))
            .collect::<Vec<_>>();

        let key = store.put(&self.table_name, self.key, attributes)?;
        let id = key.get(ID_COLUMN).cloned().ok_or(Error::Internal(format!(
            "store returned key {} without an identifier",
            key
        )))?;
        debug!(table = %self.table_name, %id, "row inserted");

        Ok(ResultSet::Insert {
            count: 1,
            last_insert_id: id,
        })
    }
}

/// UPDATE executor - partial overwrite of one existing row
pub struct Update {
    table_name: String,
    key: PrimaryKey,
    columns: Vec<(String, Value)>,
}

impl Update {
    pub fn new(table_name: String, key: PrimaryKey, columns: Vec<(String, Value)>) -> Box<Self> {
        Box::new(Self {
            table_name,
            key,
            columns,
        })
    }
}

impl<S: Store> Executor<S> for Update {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let attributes = self
            .columns
            .into_iter()
            .map(|(c, v)| (c, codec::encode_value(v)))
            .collect();
        store.update(
            &self.table_name,
            &self.key,
            attributes,
            Condition::ExpectExist,
        )?;
        Ok(ResultSet::Update { count: 1 })
    }
}

/// DELETE executor - one conditional delete per key
///
/// Keys are deleted in order; the first missing row aborts the statement and
/// rows deleted before it stay deleted.
pub struct Delete {
    table_name: String,
    keys: Vec<PrimaryKey>,
}

impl Delete {
    pub fn new(table_name: String, keys: Vec<PrimaryKey>) -> Box<Self> {
        Box::new(Self { table_name, keys })
    }
}

impl<S: Store> Executor<S> for Delete {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        for key in &self.keys {
            store.delete(&self.table_name, key, Condition::ExpectExist)?;
        }
        Ok(ResultSet::Delete {
            count: self.keys.len(),
        })
    }
}
