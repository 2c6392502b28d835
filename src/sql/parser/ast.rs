use std::collections::BTreeMap;

use crate::sql::types::ColumnType;

/// Canonical query - one variant per supported statement kind
#[derive(Debug, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        /// Declared attribute columns (identifier column excluded)
        columns: Vec<Column>,
    },
    /// DROP TABLE statement
    DropTable { name: String },
    /// INSERT statement, exactly one row
    Insert {
        table_name: String,
        columns: Vec<String>,
        values: Vec<Expression>,
    },
    /// SELECT statement in the directly executable shape
    Select {
        table_name: String,
        /// Requested columns, qualification stripped
        columns: Vec<String>,
        predicate: Option<Predicate>,
        order_by: Option<(String, OrderDirection)>,
        /// Client-side truncation only
        limit: Option<usize>,
    },
    /// UPDATE statement
    Update {
        table_name: String,
        columns: BTreeMap<String, Expression>,
        /// Identifier equality: `(column, value)`
        where_clause: (String, Expression),
    },
    /// DELETE statement
    Delete {
        table_name: String,
        where_clause: Predicate,
    },
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Column definition for CREATE TABLE statements
#[derive(Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
}

/// Right-hand side of an assignment or comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Positional parameter, by index into the statement's parameters
    Placeholder(usize),
    /// Literal NULL
    Null,
}

/// Single-column filter
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    /// `column = value`
    Equal,
    /// `column IN (value, ...)`
    In,
}
