use tracing::info;

use crate::{
    error::Result,
    sql::{executor::{Executor, ResultSet}, schema::TableMeta},
    storage::store::Store,
};

/// CREATE TABLE executor
pub struct CreateTable {
    schema: TableMeta,
}

impl CreateTable {
    pub fn new(schema: TableMeta) -> Box<Self> {
        Box::new(Self { schema })
    }
}

impl<S: Store> Executor<S> for CreateTable {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let table_name = self.schema.name.clone();
        store.create_table(self.schema)?;
        info!(table = %table_name, "table created");
        Ok(ResultSet::CreateTable { table_name })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    table_name: String,
}

impl DropTable {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl<S: Store> Executor<S> for DropTable {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        store.drop_table(&self.table_name)?;
        info!(table = %self.table_name, "table dropped");
        Ok(ResultSet::DropTable {
            table_name: self.table_name,
        })
    }
}
