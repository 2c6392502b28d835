//! Identifier assignment for inserted rows
//!
//! Two strategies:
//! - `StoreAutoIncrement` leaves the identifier slot to the store's
//!   auto-increment key column.
//! - `ClockIdGenerator` derives identifiers from wall-clock nanoseconds.
//!   One instance hands out strictly increasing values even when the clock
//!   stalls or steps back. Two instances (two processes, two sessions) can
//!   interleave or collide; nothing coordinates them.

use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use crate::{
    config::IdStrategy,
    error::{Error, Result},
    sql::types::Value,
    storage::store::KeyValue,
};

/// Produces the identifier slot for the next inserted row
pub trait IdGenerator: Send {
    fn next_id(&self) -> Result<KeyValue>;
}

impl dyn IdGenerator {
    /// Picks a strategy; `Auto` prefers the store's own counter when it has one
    pub fn build(strategy: IdStrategy, store_auto_increment: bool) -> Result<Box<dyn IdGenerator>> {
        let generator: Box<dyn IdGenerator> = match strategy {
            IdStrategy::Auto if store_auto_increment => Box::new(StoreAutoIncrement),
            IdStrategy::Auto => Box::new(ClockIdGenerator::new()),
            IdStrategy::StoreAutoIncrement if store_auto_increment => Box::new(StoreAutoIncrement),
            IdStrategy::StoreAutoIncrement => {
                return Err(Error::Store(
                    "store does not support auto-increment identifiers".to_string(),
                ));
            }
            IdStrategy::Clock => Box::new(ClockIdGenerator::new()),
        };
        debug!(?strategy, store_auto_increment, "id generator selected");
        Ok(generator)
    }
}

/// Delegates identifier assignment to the store
pub struct StoreAutoIncrement;

impl IdGenerator for StoreAutoIncrement {
    fn next_id(&self) -> Result<KeyValue> {
        Ok(KeyValue::AutoIncrement)
    }
}

/// Clock-based identifiers, strictly increasing per instance
pub struct ClockIdGenerator {
    last: Mutex<i64>,
}

impl ClockIdGenerator {
    pub fn new() -> Self {
        Self { last: Mutex::new(0) }
    }
}

impl Default for ClockIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for ClockIdGenerator {
    fn next_id(&self) -> Result<KeyValue> {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .ok_or(Error::Internal("clock out of nanosecond range".to_string()))?;
        let mut last = self.last.lock()?;
        *last = now.max(*last + 1);
        Ok(KeyValue::Value(Value::Integer(*last)))
    }
}

#[cfg(test)]
mod tests {
    use super::{ClockIdGenerator, IdGenerator};
    use crate::{config::IdStrategy, error::Result, sql::types::Value, storage::store::KeyValue};

    #[test]
    fn test_clock_ids_strictly_increase() -> Result<()> {
        let ids = ClockIdGenerator::new();
        let mut previous = i64::MIN;
        for _ in 0..1000 {
            match ids.next_id()? {
                KeyValue::Value(Value::Integer(id)) => {
                    assert!(id > previous);
                    previous = id;
                }
                other => panic!("unexpected id {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_strategy_selection() -> Result<()> {
        let auto = <dyn IdGenerator>::build(IdStrategy::Auto, true)?;
        assert_eq!(auto.next_id()?, KeyValue::AutoIncrement);

        let clock = <dyn IdGenerator>::build(IdStrategy::Auto, false)?;
        assert!(matches!(clock.next_id()?, KeyValue::Value(Value::Integer(_))));

        let clock = <dyn IdGenerator>::build(IdStrategy::Clock, true)?;
        assert!(matches!(clock.next_id()?, KeyValue::Value(Value::Integer(_))));

        assert!(<dyn IdGenerator>::build(IdStrategy::StoreAutoIncrement, false).is_err());
        Ok(())
    }
}
