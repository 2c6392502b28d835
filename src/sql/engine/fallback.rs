//! Fallback engine - answers SELECTs outside the direct grammar
//!
//! Every table the statement reads is copied, restricted to the session's
//! partition, into a fresh SQLite database, then the statement runs there unchanged apart from its
//! placeholder style. Nothing is cached between calls; each call pays a full
//! scan of every referenced table. The copy is assembled from separate page
//! reads and is not a snapshot.

use std::collections::BTreeMap;

use rusqlite::{
    Connection, params_from_iter,
    types::{Value as SqliteValue, ValueRef},
};
use tracing::{debug, warn};

use crate::{
    config::FallbackConfig,
    error::{Error, Result},
    sql::{
        codec,
        executor::ResultSet,
        parser::lexer::{Keyword, Lexer, Token},
        schema::{KeyLayout, PARTITION_COLUMN, TableMeta},
        types::{ColumnType, Row, Value},
    },
    storage::store::{KeyValue, PrimaryKey, Store},
};

/// Materializes the referenced tables and runs `sql` against them
pub fn execute<S: Store>(
    store: &S,
    layout: &KeyLayout,
    config: &FallbackConfig,
    sql: &str,
    params: &[Value],
) -> Result<ResultSet> {
    let tables = referenced_tables(sql)?;
    warn!(sql = %sql.trim(), ?tables, "statement outside the direct grammar, using fallback engine");

    // The directory must outlive the connection
    let spill_dir = match config.spill_to_disk {
        true => Some(tempfile::tempdir()?),
        false => None,
    };
    let mut conn = match &spill_dir {
        Some(dir) => Connection::open(dir.path().join("fallback.db"))?,
        None => Connection::open_in_memory()?,
    };

    for table in &tables {
        materialize(store, layout, &mut conn, table)?;
    }
    query(&conn, &rewrite_placeholders(sql), params)
}

/// Names following FROM or JOIN, plus comma-separated FROM list entries,
/// de-duplicated in order of appearance
pub fn referenced_tables(sql: &str) -> Result<Vec<String>> {
    let mut tables: Vec<String> = Vec::new();
    let mut expect_table = false;
    let mut in_from_list = false;

    for token in Lexer::new(sql) {
        let token = token?;
        if expect_table {
            expect_table = false;
            if let Token::Ident(name) = token {
                if !tables.contains(&name) {
                    tables.push(name);
                }
                in_from_list = true;
            } else {
                // A derived table: its own FROM supplies the names
                in_from_list = false;
            }
            continue;
        }
        match token {
            Token::Keyword(Keyword::From) | Token::Keyword(Keyword::Join) => expect_table = true,
            Token::Comma if in_from_list => expect_table = true,
            // Aliases, with or without AS
            Token::Ident(_) if in_from_list => {}
            _ => in_from_list = false,
        }
    }
    Ok(tables)
}

/// Copies the partition's rows of one table, all pages of them, into the
/// embedded database
fn materialize<S: Store>(
    store: &S,
    layout: &KeyLayout,
    conn: &mut Connection,
    table: &str,
) -> Result<()> {
    let meta = store.describe_table(table)?;
    let partition = Value::Integer(layout.partition);
    let rows = store.scan(
        table,
        &bound(&meta, &partition, KeyValue::Min),
        &bound(&meta, &partition, KeyValue::Max),
    )?;
    // The bounds only narrow the scan when the partition leads the key
    let records = rows
        .into_iter()
        .filter(|row| {
            row.primary_key
                .get(PARTITION_COLUMN)
                .is_none_or(|p| *p == partition)
        })
        .map(codec::decode_row)
        .collect::<Vec<_>>();

    // Declared columns first, then anything the rows carry beyond them
    let mut columns: Vec<(String, ColumnType)> = meta.columns().cloned().collect();
    let mut extra = BTreeMap::new();
    for record in &records {
        for (name, value) in record {
            if columns.iter().any(|(c, _)| c == name) {
                continue;
            }
            let slot = extra.entry(name.clone()).or_insert(None);
            if slot.is_none() {
                *slot = value.column_type();
            }
        }
    }
    columns.extend(
        extra
            .into_iter()
            .map(|(name, datatype)| (name, datatype.unwrap_or(ColumnType::String))),
    );

    let create = format!(
        "CREATE TABLE {} ({})",
        quote(table),
        columns
            .iter()
            .map(|(name, datatype)| format!("{} {}", quote(name), datatype.sqlite_type()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    conn.execute_batch(&create)?;

    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        columns
            .iter()
            .map(|(name, _)| quote(name))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&insert)?;
        for record in &records {
            stmt.execute(params_from_iter(columns.iter().map(|(name, _)| {
                record.get(name).map_or(SqliteValue::Null, to_sqlite)
            })))?;
        }
    }
    tx.commit()?;

    debug!(table, columns = columns.len(), rows = records.len(), "table materialized");
    Ok(())
}

/// A key pinned to `partition`, with every other column set to the range sentinel
fn bound(meta: &TableMeta, partition: &Value, sentinel: KeyValue) -> PrimaryKey {
    PrimaryKey::new(
        meta.primary_key
            .iter()
            .map(|(name, _)| match name.as_str() {
                PARTITION_COLUMN => (name.clone(), KeyValue::Value(partition.clone())),
                _ => (name.clone(), sentinel.clone()),
            })
            .collect(),
    )
}

fn query(conn: &Connection, sql: &str, params: &[Value]) -> Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();

    let mut rows_iter = stmt.query(params_from_iter(params.iter().map(to_sqlite)))?;
    let mut rows: Vec<Row> = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(from_sqlite(row.get_ref(i)?)?);
        }
        rows.push(values);
    }
    Ok(ResultSet::Scan { columns, rows })
}

fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Boolean(b) => SqliteValue::Integer(if *b { 1 } else { 0 }),
        Value::Integer(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::String(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Timestamp(_) => match codec::encode_value(value.clone()) {
            Value::String(s) => SqliteValue::Text(s),
            _ => SqliteValue::Null,
        },
    }
}

/// Text goes back through the row codec so timestamps read the same as on the direct path
fn from_sqlite(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|err| Error::Internal(format!("fallback engine: text decode failed: {}", err)))?;
            codec::decode_value(Value::String(text.to_string()))
        }
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rewrites `%s` placeholders to `?`, leaving string literals and quoted
/// identifiers alone
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '%' && chars.peek() == Some(&'s') => {
                chars.next();
                out.push('?');
                continue;
            }
            None => {}
        }
        out.push(c);
    }
    out
}
