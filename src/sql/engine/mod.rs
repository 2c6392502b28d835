use tracing::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        idgen::IdGenerator,
        parser::Parser,
        plan::{Plan, planner::Planner},
        schema::KeyLayout,
        types::Value,
    },
    storage::store::Store,
};

pub mod fallback;

/// SQL session for executing statements against one store handle
///
/// The session owns its store: one handle per logical session. Every
/// statement is independent; there are no multi-statement transactions.
pub struct Session<S: Store> {
    store: S,
    config: Config,
    layout: KeyLayout,
    ids: Box<dyn IdGenerator>,
}

impl<S: Store + 'static> Session<S> {
    pub fn new(store: S, config: Config) -> Result<Self> {
        let ids = <dyn IdGenerator>::build(config.id_strategy, store.supports_auto_increment())?;
        let layout = KeyLayout::new(config.partition, &config.index_prefix);
        Ok(Self {
            store,
            config,
            layout,
            ids,
        })
    }

    /// Executes a SQL statement with positional parameters
    ///
    /// Statements in the direct grammar run as store primitives. A SELECT
    /// outside it is answered by the fallback engine; anything else outside
    /// it fails with `Error::Unsupported`.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        debug!(sql = %sql.trim(), params = params.len(), "executing statement");
        match Parser::new(sql).parse() {
            Ok(stmt) => {
                let planner = Planner::new(&self.layout, self.ids.as_ref());
                Plan::build(stmt, params, &planner)?.execute(&mut self.store)
            }
            Err(Error::FallbackRequired(_)) if self.config.fallback.enabled => {
                fallback::execute(&self.store, &self.layout, &self.config.fallback, sql, params)
            }
            Err(Error::FallbackRequired(sql)) => Err(Error::Unsupported(format!(
                "SELECT outside the direct grammar with the fallback engine disabled: {}",
                sql.trim()
            ))),
            Err(err) => Err(err),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
