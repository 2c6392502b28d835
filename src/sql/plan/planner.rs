use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        idgen::IdGenerator,
        parser::ast::{self, Expression, Predicate},
        plan::{Node, Plan},
        schema::{ID_COLUMN, KeyLayout, TableMeta},
        types::Value,
    },
    storage::store::KeyValue,
};

/// Query planner - picks the cheapest store access path for a canonical query
///
/// SELECT access paths, in order:
/// 1. no predicate: full range scan of the table
/// 2. identifier equals one value: point get
/// 3. identifier in several values: one batch get
/// 4. any other column: range scan of that column's index table
pub struct Planner<'a> {
    layout: &'a KeyLayout,
    ids: &'a dyn IdGenerator,
}

impl<'a> Planner<'a> {
    pub fn new(layout: &'a KeyLayout, ids: &'a dyn IdGenerator) -> Self {
        Self { layout, ids }
    }

    /// Builds an execution plan from a canonical query
    pub fn build(&self, stmt: ast::Statement, params: &[Value]) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt, params)?))
    }

    pub fn build_statement(&self, stmt: ast::Statement, params: &[Value]) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::CreateTable { name, columns } => Node::CreateTable {
                schema: TableMeta::base_table(
                    &name,
                    columns.into_iter().map(|c| (c.name, c.datatype)).collect(),
                ),
            },
            ast::Statement::DropTable { name } => Node::DropTable { table_name: name },
            ast::Statement::Insert {
                table_name,
                columns,
                values,
            } => Node::Insert {
                table_name,
                key: self.layout.row_key(self.ids.next_id()?),
                columns: columns
                    .into_iter()
                    .zip(values)
                    .map(|(c, v)| Ok((c, bind(&v, params)?)))
                    .collect::<Result<_>>()?,
            },
            ast::Statement::Select {
                table_name,
                columns,
                predicate,
                order_by,
                limit,
            } => {
                let mut node = self.build_access_path(table_name, predicate, params)?;

                if let Some((column, direction)) = order_by {
                    node = Node::Order {
                        source: Box::new(node),
                        column,
                        direction,
                    }
                }

                // LIMIT is never pushed down to the store
                if let Some(limit) = limit {
                    node = Node::Limit {
                        source: Box::new(node),
                        limit,
                    }
                }

                Node::Projection {
                    source: Box::new(node),
                    columns,
                }
            }
            ast::Statement::Update {
                table_name,
                columns,
                where_clause: (_, id),
            } => Node::Update {
                table_name,
                key: self.layout.row_key(bind(&id, params)?.into()),
                // `SET col = NULL` leaves the stored value untouched
                columns: columns
                    .into_iter()
                    .filter(|(_, expr)| *expr != Expression::Null)
                    .map(|(c, expr)| Ok((c, bind(&expr, params)?)))
                    .collect::<Result<_>>()?,
            },
            ast::Statement::Delete {
                table_name,
                where_clause,
            } => Node::Delete {
                table_name,
                keys: bind_distinct(&where_clause.values, params)?
                    .into_iter()
                    .map(|v| self.layout.row_key(v.into()))
                    .collect(),
            },
        })
    }

    fn build_access_path(
        &self,
        table_name: String,
        predicate: Option<Predicate>,
        params: &[Value],
    ) -> Result<Node> {
        let Some(predicate) = predicate else {
            debug!(table = %table_name, "access path: full scan");
            return Ok(Node::Scan {
                start: self.layout.row_key(KeyValue::Min),
                end: self.layout.row_key(KeyValue::Max),
                table_name,
            });
        };

        let values = bind_distinct(&predicate.values, params)?;

        Ok(match (predicate.column.as_str(), predicate.operator) {
            (ID_COLUMN, _) if values.len() == 1 => {
                debug!(table = %table_name, "access path: point get");
                Node::KeyLookup {
                    key: self.layout.row_key(values[0].clone().into()),
                    table_name,
                }
            }
            (ID_COLUMN, _) => {
                debug!(table = %table_name, keys = values.len(), "access path: batch get");
                Node::BatchKeyLookup {
                    keys: values
                        .into_iter()
                        .map(|v| self.layout.row_key(v.into()))
                        .collect(),
                    table_name,
                }
            }
            (column, _) => {
                let index_table = self.layout.index_table_name(&table_name, column);
                debug!(table = %table_name, index = %index_table, "access path: index scan");
                Node::IndexScan {
                    ranges: values
                        .iter()
                        .map(|v| {
                            (
                                self.layout.index_key(column, v, KeyValue::Min),
                                self.layout.index_key(column, v, KeyValue::Max),
                            )
                        })
                        .collect(),
                    index_table,
                    table_name,
                }
            }
        })
    }
}

/// Resolves an expression against the positional parameters
fn bind(expr: &Expression, params: &[Value]) -> Result<Value> {
    match expr {
        Expression::Null => Ok(Value::Null),
        Expression::Placeholder(i) => params.get(*i).cloned().ok_or(Error::Parse(format!(
            "missing parameter {} of {}",
            i + 1,
            params.len()
        ))),
    }
}

/// Binds a value list, keeping the first occurrence of each value
fn bind_distinct(exprs: &[Expression], params: &[Value]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = bind(expr, params)?;
        if !values.contains(&value) {
            values.push(value);
        }
    }
    Ok(values)
}
