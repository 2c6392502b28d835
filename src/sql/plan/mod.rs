use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{self, OrderDirection},
        schema::TableMeta,
        types::Value,
    },
    storage::store::{PrimaryKey, Store},
};

use self::planner::Planner;

pub mod planner;

/// Execution plan node
///
/// Leaf nodes are single store access paths; `Order`, `Limit` and
/// `Projection` post-process their source in memory.
#[derive(Debug, PartialEq)]
pub enum Node {
    CreateTable {
        schema: TableMeta,
    },
    DropTable {
        table_name: String,
    },
    /// Writes one row; the key's identifier slot may be store-assigned
    Insert {
        table_name: String,
        key: PrimaryKey,
        columns: Vec<(String, Value)>,
    },
    /// Partial overwrite of an existing row
    Update {
        table_name: String,
        key: PrimaryKey,
        columns: Vec<(String, Value)>,
    },
    /// One conditional delete per key
    Delete {
        table_name: String,
        keys: Vec<PrimaryKey>,
    },
    /// Full ordered range scan of the base table
    Scan {
        table_name: String,
        start: PrimaryKey,
        end: PrimaryKey,
    },
    /// Point get by identifier
    KeyLookup {
        table_name: String,
        key: PrimaryKey,
    },
    /// Batch get; result order is not tied to key order
    BatchKeyLookup {
        table_name: String,
        keys: Vec<PrimaryKey>,
    },
    /// Range scans over an index table, one range per looked-up value,
    /// followed by a batch get of the base rows the index entries point at
    IndexScan {
        table_name: String,
        index_table: String,
        ranges: Vec<(PrimaryKey, PrimaryKey)>,
    },
    /// In-memory stable sort on one column
    Order {
        source: Box<Node>,
        column: String,
        direction: OrderDirection,
    },
    /// Client-side truncation
    Limit {
        source: Box<Node>,
        limit: usize,
    },
    Projection {
        source: Box<Node>,
        columns: Vec<String>,
    },
}

/// Execution plan
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    /// Builds a plan from a canonical query and its parameters
    pub fn build(stmt: ast::Statement, params: &[Value], planner: &Planner) -> Result<Self> {
        planner.build(stmt, params)
    }

    /// Executes the plan against a store
    pub fn execute<S: Store + 'static>(self, store: &mut S) -> Result<ResultSet> {
        <dyn Executor<S>>::build(self.0).execute(store)
    }
}
