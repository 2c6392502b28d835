use std::{cmp::Ordering, fmt::Display};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Text layout used when a timestamp goes over the wire as a string
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Attribute column types the store understands
///
/// Timestamps have no store type: they travel as `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Double,
    Boolean,
    Binary,
}

impl ColumnType {
    /// Maps a SQL type name (first word of a column declaration) to a store type
    pub fn from_sql(type_name: &str) -> Self {
        let name = type_name.to_lowercase();
        match name.as_str() {
            "bool" | "boolean" => Self::Boolean,
            "real" | "float" | "double" | "decimal" | "numeric" => Self::Double,
            "blob" | "binary" | "varbinary" | "bytea" => Self::Binary,
            "int" | "integer" | "int2" | "int4" | "int8" | "tinyint" | "smallint" | "mediumint"
            | "bigint" | "serial" | "smallserial" | "bigserial" => Self::Integer,
            _ => Self::String,
        }
    }

    /// Column type name used when the table is created in the embedded engine
    pub fn sqlite_type(&self) -> &'static str {
        match self {
            Self::String => "text",
            Self::Integer => "bigint",
            Self::Double => "real",
            Self::Boolean => "boolean",
            Self::Binary => "blob",
        }
    }
}

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns the store column type of the value, or None if it's Null
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(ColumnType::Boolean),
            Self::Integer(_) => Some(ColumnType::Integer),
            Self::Float(_) => Some(ColumnType::Double),
            Self::String(_) | Self::Timestamp(_) => Some(ColumnType::String),
            Self::Bytes(_) => Some(ColumnType::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Total order used by ORDER BY
    ///
    /// Values rank by type first: Null, Boolean, numbers, String, Bytes,
    /// Timestamp. Integers and floats compare by numeric value, and NaN
    /// sorts above every other number.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => int_float_cmp(*a, *b),
            (Value::Float(a), Value::Integer(b)) => int_float_cmp(*b, *a).reverse(),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
            Value::Timestamp(_) => 5,
        }
    }
}

/// Compares exactly: integers beyond 2^53 that round to the same float still order
fn int_float_cmp(a: i64, b: f64) -> Ordering {
    (a as f64)
        .total_cmp(&b)
        .then_with(|| (a as i128).cmp(&(b as i128)))
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) if *b => write!(f, "TRUE"),
            Value::Boolean(_) => write!(f, "FALSE"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Implements partial ordering for Value comparison (used by ORDER BY)
///
/// NULL sorts below every other value.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.partial_cmp(b),
            (_, _) => None,
        }
    }
}

/// A row is a vector of values
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{ColumnType, Value};

    #[test]
    fn test_column_type_from_sql() {
        assert_eq!(ColumnType::from_sql("integer"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql("smallint"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql("varchar"), ColumnType::String);
        assert_eq!(ColumnType::from_sql("datetime"), ColumnType::String);
        assert_eq!(ColumnType::from_sql("bool"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_sql("double"), ColumnType::Double);
        assert_eq!(ColumnType::from_sql("blob"), ColumnType::Binary);
    }

    #[test]
    fn test_null_sorts_low() {
        assert!(Value::Null < Value::Integer(i64::MIN));
        assert!(Value::Integer(1) < Value::Float(1.5));
        assert_eq!(Value::Integer(1).partial_cmp(&Value::String("1".into())), None);
    }

    #[test]
    fn test_sort_cmp_is_total() {
        let mut values = vec![
            Value::String("b".into()),
            Value::Float(f64::NAN),
            Value::Integer(3),
            Value::Null,
            Value::Float(2.5),
            Value::Boolean(true),
            Value::String("a".into()),
            Value::Integer(-1),
            Value::Float(f64::NEG_INFINITY),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Boolean(true));
        assert_eq!(values[2], Value::Float(f64::NEG_INFINITY));
        assert_eq!(values[3], Value::Integer(-1));
        assert_eq!(values[4], Value::Float(2.5));
        assert_eq!(values[5], Value::Integer(3));
        assert!(matches!(values[6], Value::Float(f) if f.is_nan()));
        assert_eq!(values[7], Value::String("a".into()));
        assert_eq!(values[8], Value::String("b".into()));

        let big = 1i64 << 53;
        assert_eq!(Value::Integer(big + 1).sort_cmp(&Value::Float(big as f64)), Ordering::Greater);
        assert_eq!(Value::Integer(big).sort_cmp(&Value::Float(big as f64)), Ordering::Equal);
    }
}
