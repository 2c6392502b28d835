//! Order-preserving byte encoding of primary keys
//!
//! Encoded keys compare bytewise in the same order as the key values compare,
//! column by column, which lets a plain ordered byte map serve range scans.
//! Each value is a one-byte type tag followed by its payload:
//! - integers: big-endian with the sign bit flipped
//! - floats: IEEE bits, sign-flipped so negatives sort first
//! - strings and bytes: 0x00 escaped as 0x00 0xff, terminated by 0x00 0x00
//!
//! `KeyValue::Min` ends the encoding (a prefix sorts before its extensions);
//! `KeyValue::Max` appends 0xff, above every tag.

use crate::{
    error::{Error, Result},
    sql::types::{TIMESTAMP_FORMAT, Value},
    storage::store::{KeyValue, PrimaryKey},
};

const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const MAX: u8 = 0xff;

/// Serializes a primary key (or range bound) to an order-preserving byte key
pub fn serialize_key(key: &PrimaryKey) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (name, part) in &key.0 {
        match part {
            KeyValue::Min => break,
            KeyValue::Max => {
                out.push(MAX);
                break;
            }
            KeyValue::AutoIncrement => {
                return Err(Error::Store(format!(
                    "auto-increment column {} has no position in the key space",
                    name
                )));
            }
            KeyValue::Value(value) => encode_value(&mut out, name, value)?,
        }
    }
    Ok(out)
}

fn encode_value(out: &mut Vec<u8>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => {
            return Err(Error::Store(format!("key column {} cannot be null", name)));
        }
        Value::Boolean(b) => {
            out.push(TAG_BOOLEAN);
            out.push(*b as u8);
        }
        Value::Integer(i) => {
            out.push(TAG_INTEGER);
            out.extend(((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            let bits = f.to_bits();
            let bits = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
            out.extend(bits.to_be_bytes());
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            encode_bytes(out, s.as_bytes());
        }
        Value::Timestamp(ts) => {
            out.push(TAG_STRING);
            encode_bytes(out, ts.format(TIMESTAMP_FORMAT).to_string().as_bytes());
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            encode_bytes(out, b);
        }
    }
    Ok(())
}

fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for b in bytes {
        match b {
            0x00 => out.extend([0x00, 0xff]),
            b => out.push(*b),
        }
    }
    out.extend([0x00, 0x00]);
}

#[cfg(test)]
mod tests {
    use super::serialize_key;
    use crate::{
        error::Result,
        sql::types::Value,
        storage::store::{KeyValue, PrimaryKey},
    };

    fn key(values: Vec<KeyValue>) -> PrimaryKey {
        PrimaryKey::new(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (format!("c{}", i), v))
                .collect(),
        )
    }

    fn int(i: i64) -> KeyValue {
        KeyValue::Value(Value::Integer(i))
    }

    #[test]
    fn test_integer_order() -> Result<()> {
        let ints = [i64::MIN, -5, -1, 0, 1, 7, 300, i64::MAX];
        let encoded = ints
            .iter()
            .map(|i| serialize_key(&key(vec![int(0), int(*i)])))
            .collect::<Result<Vec<_>>>()?;
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn test_string_order_and_escape() -> Result<()> {
        let a = serialize_key(&key(vec![KeyValue::Value(Value::String("a".into())), int(9)]))?;
        let a0 = serialize_key(&key(vec![KeyValue::Value(Value::String("a\0".into())), int(1)]))?;
        let ab = serialize_key(&key(vec![KeyValue::Value(Value::String("ab".into())), int(1)]))?;
        assert!(a < a0);
        assert!(a0 < ab);
        Ok(())
    }

    #[test]
    fn test_bounds() -> Result<()> {
        let min = serialize_key(&key(vec![int(0), KeyValue::Min]))?;
        let max = serialize_key(&key(vec![int(0), KeyValue::Max]))?;
        let row = serialize_key(&key(vec![int(0), int(i64::MAX)]))?;
        let next_partition = serialize_key(&key(vec![int(1), KeyValue::Min]))?;
        assert!(min < row);
        assert!(row < max);
        assert!(max < next_partition);

        assert!(serialize_key(&key(vec![int(0), KeyValue::AutoIncrement])).is_err());
        assert!(serialize_key(&key(vec![KeyValue::Value(Value::Null)])).is_err());
        Ok(())
    }
}
