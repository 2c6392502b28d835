//! Row codec - store rows to named, typed values and back
//!
//! Timestamps are written as text and recovered on read: any textual
//! attribute that parses as a full date-time decodes as a timestamp. A genuine
//! text value shaped like a date-time is therefore read back as a timestamp.
//! The rule is deterministic: the same text always decodes the same way.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};

use crate::{
    sql::types::{TIMESTAMP_FORMAT, Value},
    storage::store::{KeyValue, StoreRow},
};

/// A decoded row: column name to value
pub type Record = BTreeMap<String, Value>;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Parses a full date-time, normalizing any UTC offset away
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Some(naive) = text.strip_suffix('Z') {
        return parse_naive(naive);
    }
    parse_naive(text).or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|f| DateTime::parse_from_str(text, f).ok())
            .map(|dt| dt.naive_utc())
    })
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
}

/// Decodes a single stored value
pub fn decode_value(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::String(s),
        },
        v => v,
    }
}

/// Prepares a value for the store: timestamps travel as text
pub fn encode_value(value: Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::String(ts.format(TIMESTAMP_FORMAT).to_string()),
        v => v,
    }
}

/// Decodes a store row into a record of key and attribute columns
pub fn decode_row(row: StoreRow) -> Record {
    let mut record = Record::new();
    for (name, key_value) in row.primary_key.0 {
        if let KeyValue::Value(value) = key_value {
            record.insert(name, decode_value(value));
        }
    }
    for (name, value) in row.attributes {
        record.insert(name, decode_value(value));
    }
    record
}
