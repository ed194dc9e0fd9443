use crate::{Params, Result, Row, Value};

use std::fmt::Debug;

/// The database connection the engine executes statements on.
///
/// Statements are executed one at a time; the `fetch_*` methods read the
/// result of the most recent [`execute_query`](Storage::execute_query).
/// Transaction nesting is handled by the caller, so an implementation only
/// ever sees one open transaction.
pub trait Storage: Debug {
    /// Executes `sql`, binding `params` to its `:name` placeholders. When
    /// `streaming` is set the implementation may fetch rows lazily.
    fn execute_query(&mut self, sql: &str, params: &Params, streaming: bool) -> Result<()>;

    /// All rows of the last result.
    fn fetch_results(&mut self) -> Result<Vec<Row>>;

    /// The next row of the last result.
    fn fetch_result(&mut self) -> Result<Option<Row>> {
        Ok(self.fetch_results()?.into_iter().next())
    }

    /// The first column of every row of the last result.
    fn fetch_values(&mut self) -> Result<Vec<Value>> {
        Ok(self
            .fetch_results()?
            .into_iter()
            .filter_map(|row| row.into_iter().next().map(|(_, value)| value))
            .collect())
    }

    /// The first column of the first row of the last result.
    fn fetch_value(&mut self) -> Result<Value> {
        Ok(self.fetch_values()?.into_iter().next().unwrap_or_default())
    }

    fn affected_record_count(&self) -> u64;

    /// Key generated by the last INSERT.
    fn last_insert_id(&self) -> Value;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}
