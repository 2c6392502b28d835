use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::{schema::TableMeta, types::Value},
    storage::{
        keycode::serialize_key,
        store::{Condition, Direction, KeyValue, PrimaryKey, RangePage, Store, StoreRow},
    },
};

/// Rows per range page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// In-memory wide-column store
///
/// Each table is an ordered byte map from encoded primary key to a
/// bincode-serialized row body, so range scans walk keys in key order.
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
    page_size: usize,
    auto_increment: bool,
}

struct MemoryTable {
    meta: TableMeta,
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Last identifier handed out for `KeyValue::AutoIncrement`
    sequence: i64,
}

/// Serialized row body
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    primary_key: PrimaryKey,
    attributes: BTreeMap<String, Value>,
}

impl StoredRow {
    fn into_row(self) -> StoreRow {
        StoreRow {
            primary_key: self.primary_key,
            attributes: self.attributes.into_iter().collect(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            auto_increment: true,
        }
    }

    /// Sets the maximum number of rows returned per range page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Disables store-side identifier assignment
    pub fn without_auto_increment(mut self) -> Self {
        self.auto_increment = false;
        self
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or(Error::Store(format!("table {} does not exist", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or(Error::Store(format!("table {} does not exist", name)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTable {
    /// Checks the key matches the declared key shape and encodes it
    fn encode_key(&self, key: &PrimaryKey) -> Result<Vec<u8>> {
        let names = key.0.iter().map(|(name, _)| name.as_str());
        let declared = self.meta.primary_key.iter().map(|(name, _)| name.as_str());
        if !names.eq(declared) {
            return Err(Error::Store(format!(
                "key {} does not match the primary key of table {}",
                key, self.meta.name
            )));
        }
        serialize_key(key)
    }

    fn load(&self, encoded: &[u8]) -> Result<Option<StoredRow>> {
        Ok(self
            .rows
            .get(encoded)
            .map(|v| bincode::deserialize(v))
            .transpose()?)
    }

    fn store(&mut self, encoded: Vec<u8>, row: &StoredRow) -> Result<()> {
        self.rows.insert(encoded, bincode::serialize(row)?);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<StoreRow>> {
        let table = self.table(table)?;
        key.values()?;
        let encoded = table.encode_key(key)?;
        Ok(table.load(&encoded)?.map(StoredRow::into_row))
    }

    fn get_range(
        &self,
        table: &str,
        direction: Direction,
        start: &PrimaryKey,
        end: &PrimaryKey,
    ) -> Result<RangePage> {
        let table = self.table(table)?;
        let from = table.encode_key(start)?;
        let to = table.encode_key(end)?;

        let range: Box<dyn Iterator<Item = (&Vec<u8>, &Vec<u8>)> + '_> = match direction {
            Direction::Forward if from < to => Box::new(
                table
                    .rows
                    .range::<Vec<u8>, _>((Bound::Included(&from), Bound::Excluded(&to))),
            ),
            Direction::Backward if to < from => Box::new(
                table
                    .rows
                    .range::<Vec<u8>, _>((Bound::Excluded(&to), Bound::Included(&from)))
                    .rev(),
            ),
            _ => Box::new(std::iter::empty()),
        };

        let mut rows = Vec::new();
        let mut next_start_key = None;
        for (_, value) in range {
            let row: StoredRow = bincode::deserialize(value)?;
            if rows.len() == self.page_size {
                next_start_key = Some(row.primary_key);
                break;
            }
            rows.push(row.into_row());
        }
        Ok(RangePage {
            rows,
            next_start_key,
        })
    }

    fn batch_get(
        &self,
        table: &str,
        keys: &[PrimaryKey],
    ) -> Result<Vec<(PrimaryKey, Option<StoreRow>)>> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.get(table, key)?)))
            .collect()
    }

    fn put(
        &mut self,
        table: &str,
        mut key: PrimaryKey,
        attributes: Vec<(String, Value)>,
    ) -> Result<PrimaryKey> {
        let auto_increment = self.auto_increment;
        let table = self.table_mut(table)?;

        for (name, part) in key.0.iter_mut() {
            if *part == KeyValue::AutoIncrement {
                if !auto_increment {
                    return Err(Error::Store(format!(
                        "auto-increment requested for {} but not supported",
                        name
                    )));
                }
                table.sequence += 1;
                *part = KeyValue::Value(Value::Integer(table.sequence));
            }
        }
        key.values()?;
        let encoded = table.encode_key(&key)?;

        // Explicit identifiers keep the sequence ahead of them
        if let Some((name, _)) = table.meta.primary_key.last() {
            if let Some(Value::Integer(id)) = key.get(name) {
                table.sequence = table.sequence.max(*id);
            }
        }

        let row = StoredRow {
            primary_key: key.clone(),
            attributes: attributes.into_iter().collect(),
        };
        table.store(encoded, &row)?;
        Ok(key)
    }

    fn update(
        &mut self,
        table: &str,
        key: &PrimaryKey,
        attributes: Vec<(String, Value)>,
        condition: Condition,
    ) -> Result<()> {
        let table_name = table;
        let table = self.table_mut(table)?;
        key.values()?;
        let encoded = table.encode_key(key)?;

        let mut row = match (table.load(&encoded)?, condition) {
            (Some(row), _) => row,
            (None, Condition::Ignore) => StoredRow {
                primary_key: key.clone(),
                attributes: BTreeMap::new(),
            },
            (None, Condition::ExpectExist) => {
                return Err(Error::RowNotFound(format!("{} {}", table_name, key)));
            }
        };
        row.attributes.extend(attributes);
        table.store(encoded, &row)
    }

    fn delete(&mut self, table: &str, key: &PrimaryKey, condition: Condition) -> Result<()> {
        let table_name = table;
        let table = self.table_mut(table)?;
        key.values()?;
        let encoded = table.encode_key(key)?;

        if table.rows.remove(&encoded).is_none() && condition == Condition::ExpectExist {
            return Err(Error::RowNotFound(format!("{} {}", table_name, key)));
        }
        Ok(())
    }

    fn create_table(&mut self, meta: TableMeta) -> Result<()> {
        if self.tables.contains_key(&meta.name) {
            return Err(Error::Store(format!("table {} already exists", meta.name)));
        }
        if meta.primary_key.is_empty() {
            return Err(Error::Store(format!("table {} has no primary key", meta.name)));
        }
        self.tables.insert(
            meta.name.clone(),
            MemoryTable {
                meta,
                rows: BTreeMap::new(),
                sequence: 0,
            },
        );
        Ok(())
    }

    fn drop_table(&mut self, table: &str) -> Result<()> {
        self.tables
            .remove(table)
            .map(|_| ())
            .ok_or(Error::Store(format!("table {} does not exist", table)))
    }

    fn describe_table(&self, table: &str) -> Result<TableMeta> {
        Ok(self.table(table)?.meta.clone())
    }

    fn supports_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::{
        error::{Error, Result},
        sql::{
            schema::TableMeta,
            types::{ColumnType, Value},
        },
        storage::store::{Condition, Direction, KeyValue, PrimaryKey, Store},
    };

    fn key(id: KeyValue) -> PrimaryKey {
        PrimaryKey::new(vec![
            ("_partition".to_string(), Value::Integer(0).into()),
            ("id".to_string(), id),
        ])
    }

    fn setup(store: &mut MemoryStore) -> Result<()> {
        store.create_table(TableMeta::base_table("t", vec![("a".into(), ColumnType::Integer)]))?;
        for i in 1..=5 {
            store.put("t", key(KeyValue::AutoIncrement), vec![("a".into(), Value::Integer(i * 10))])?;
        }
        Ok(())
    }

    #[test]
    fn test_point_opt() -> Result<()> {
        let mut store = MemoryStore::new();
        setup(&mut store)?;

        let row = store.get("t", &key(Value::Integer(3).into()))?.expect("row 3");
        assert_eq!(row.attributes, vec![("a".to_string(), Value::Integer(30))]);
        assert_eq!(store.get("t", &key(Value::Integer(9).into()))?, None);

        store.update(
            "t",
            &key(Value::Integer(3).into()),
            vec![("b".into(), Value::String("x".into()))],
            Condition::ExpectExist,
        )?;
        let row = store.get("t", &key(Value::Integer(3).into()))?.expect("row 3");
        assert_eq!(row.attributes.len(), 2);

        assert!(matches!(
            store.update("t", &key(Value::Integer(9).into()), vec![], Condition::ExpectExist),
            Err(Error::RowNotFound(_))
        ));

        store.delete("t", &key(Value::Integer(3).into()), Condition::ExpectExist)?;
        assert!(matches!(
            store.delete("t", &key(Value::Integer(3).into()), Condition::ExpectExist),
            Err(Error::RowNotFound(_))
        ));
        store.delete("t", &key(Value::Integer(3).into()), Condition::Ignore)?;
        Ok(())
    }

    #[test]
    fn test_scan_pages() -> Result<()> {
        let mut store = MemoryStore::new().with_page_size(2);
        setup(&mut store)?;

        let mut start = key(KeyValue::Min);
        let end = key(KeyValue::Max);
        let mut ids = Vec::new();
        let mut pages = 0;
        loop {
            let page = store.get_range("t", Direction::Forward, &start, &end)?;
            pages += 1;
            ids.extend(page.rows.iter().map(|r| r.primary_key.get("id").cloned()));
            match page.next_start_key {
                Some(next) => start = next,
                None => break,
            }
        }
        assert_eq!(pages, 3);
        assert_eq!(ids, (1..=5).map(|i| Some(Value::Integer(i))).collect::<Vec<_>>());

        let page = store.get_range("t", Direction::Backward, &key(KeyValue::Max), &key(KeyValue::Min))?;
        assert_eq!(page.rows[0].primary_key.get("id"), Some(&Value::Integer(5)));
        assert_eq!(page.next_start_key, Some(key(Value::Integer(3).into())));
        Ok(())
    }

    #[test]
    fn test_batch_get() -> Result<()> {
        let mut store = MemoryStore::new();
        setup(&mut store)?;
        let keys = vec![key(Value::Integer(1).into()), key(Value::Integer(42).into())];
        let results = store.batch_get("t", &keys)?;
        assert!(results[0].1.is_some());
        assert!(results[1].1.is_none());
        Ok(())
    }

    #[test]
    fn test_table_lifecycle() -> Result<()> {
        let mut store = MemoryStore::new().without_auto_increment();
        setup(&mut store).unwrap_err();

        assert!(store.create_table(TableMeta::base_table("t", vec![])).is_err());
        assert_eq!(store.describe_table("t")?.defined_columns.len(), 1);
        store.drop_table("t")?;
        assert!(matches!(store.get("t", &key(Value::Integer(1).into())), Err(Error::Store(_))));
        assert!(store.drop_table("t").is_err());
        Ok(())
    }
}
