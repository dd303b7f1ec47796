use async_trait::async_trait;

use crate::core::{Datum, RowSet, SQLError};

pub mod postgres;

pub use postgres::PgBackend;

/// A relational backend able to hand out transactions.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, SQLError>;
}

/// One open transaction. Dropping it without `commit` or `rollback` must roll
/// it back; callers rely on that for cancellation and panics.
///
/// Statement errors the engine raised itself come back as
/// `ErrorKind::ExecutionError`; anything else means the statement never got
/// an answer.
#[async_trait]
pub trait Transaction: Send {
    async fn query(&mut self, sql: &str, params: &[Datum]) -> Result<RowSet, SQLError>;

    async fn execute(&mut self, sql: &str, params: &[Datum]) -> Result<u64, SQLError>;

    async fn commit(self: Box<Self>) -> Result<(), SQLError>;

    async fn rollback(self: Box<Self>) -> Result<(), SQLError>;
}
