use std::collections::BTreeSet;

use crate::{
    error::Result,
    sql::{
        codec::Record,
        executor::{
            mutation::{Delete, Insert, Update},
            query::{BatchKeyLookup, IndexScan, KeyLookup, Limit, Order, Projection, Scan},
            schema::{CreateTable, DropTable},
        },
        plan::Node,
        types::{Row, Value},
    },
    storage::store::Store,
};

mod mutation;
mod query;
mod schema;

/// SQL executor trait
pub trait Executor<S: Store> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
///
/// The `'static` bound is required for trait object usage in recursive executor building.
impl<S: Store + 'static> dyn Executor<S> {
    pub fn build(node: Node) -> Box<dyn Executor<S>> {
        match node {
            Node::CreateTable { schema } => CreateTable::new(schema),
            Node::DropTable { table_name } => DropTable::new(table_name),
            Node::Insert {
                table_name,
                key,
                columns,
            } => Insert::new(table_name, key, columns),
            Node::Update {
                table_name,
                key,
                columns,
            } => Update::new(table_name, key, columns),
            Node::Delete { table_name, keys } => Delete::new(table_name, keys),
            Node::Scan {
                table_name,
                start,
                end,
            } => Scan::new(table_name, start, end),
            Node::KeyLookup { table_name, key } => KeyLookup::new(table_name, key),
            Node::BatchKeyLookup { table_name, keys } => BatchKeyLookup::new(table_name, keys),
            Node::IndexScan {
                table_name,
                index_table,
                ranges,
            } => IndexScan::new(table_name, index_table, ranges),
            Node::Order {
                source,
                column,
                direction,
            } => Order::new(Self::build(*source), column, direction),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Projection { source, columns } => Projection::new(Self::build(*source), columns),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable {
        table_name: String,
    },
    DropTable {
        table_name: String,
    },
    Insert {
        count: usize,
        /// Identifier assigned to the inserted row
        last_insert_id: Value,
    },
    Scan {
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    Update {
        count: usize,
    },
    Delete {
        count: usize,
    },
}

impl ResultSet {
    /// Lays decoded records out as a scan result over the union of their columns
    ///
    /// Records are open-ended: a column absent from one record reads as Null.
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns = records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        ResultSet::Scan { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::ResultSet;
    use crate::sql::{codec::Record, types::Value};

    #[test]
    fn test_from_records_fills_missing_columns() {
        let mut a = Record::new();
        a.insert("id".into(), Value::Integer(1));
        a.insert("name".into(), Value::String("a".into()));
        let mut b = Record::new();
        b.insert("id".into(), Value::Integer(2));
        b.insert("age".into(), Value::Integer(30));

        assert_eq!(
            ResultSet::from_records(vec![a, b]),
            ResultSet::Scan {
                columns: vec!["age".into(), "id".into(), "name".into()],
                rows: vec![
                    vec![Value::Null, Value::Integer(1), Value::String("a".into())],
                    vec![Value::Integer(30), Value::Integer(2), Value::Null],
                ],
            }
        );
    }
}
