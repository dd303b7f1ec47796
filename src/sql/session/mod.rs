pub mod context;

use std::future::Future;

use tokio::time::{timeout_at, Instant};

use self::context::QueryContext;
use crate::core::{Datum, ErrorKind, QueryResult, SQLError};

/// How the generic path treats a statement once it has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Starts with `SELECT`; committed.
    Read,
    /// Anything else; always rolled back by [`Session::execute`].
    Other,
}

/// Classifies by the first keyword of the trimmed statement, ignoring case.
pub fn classify(sql_text: &str) -> StatementKind {
    let text = sql_text.trim_start();
    let keyword = text
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");

    if keyword.eq_ignore_ascii_case("SELECT") {
        StatementKind::Read
    } else {
        StatementKind::Other
    }
}

/// Runs SQL text against a backend, one transaction per call.
///
/// [`Session::execute`] is the generic read path: a statement the engine
/// rejects comes back as [`QueryResult::error`], and only `SELECT`
/// statements are committed. [`Session::execute_write`] is the only path
/// that makes other statements durable.
pub struct Session {
    ctx: QueryContext,
}

impl Session {
    pub fn new(ctx: QueryContext) -> Self {
        Self { ctx }
    }

    pub fn logger(&self) -> &crate::util::Logger {
        &self.ctx.logger
    }

    pub async fn execute(&self, sql_text: &str) -> Result<QueryResult, SQLError> {
        self.execute_with(sql_text, &[]).await
    }

    pub async fn execute_with(
        &self,
        sql_text: &str,
        params: &[Datum],
    ) -> Result<QueryResult, SQLError> {
        self.execute_until(sql_text, params, self.default_deadline())
            .await
    }

    /// Like [`Session::execute_with`] with a caller-chosen deadline. When it
    /// passes the in-flight transaction is dropped, which rolls it back.
    pub async fn execute_until(
        &self,
        sql_text: &str,
        params: &[Datum],
        deadline: Instant,
    ) -> Result<QueryResult, SQLError> {
        self.ctx
            .logger
            .info(format_args!("Executing SQL: {}", sql_text));

        self.with_deadline(deadline, self.run_query(sql_text, params))
            .await
    }

    pub async fn execute_write(&self, sql_text: &str) -> Result<u64, SQLError> {
        self.execute_write_with(sql_text, &[]).await
    }

    /// Runs a statement and commits it if it succeeded. Any failure rolls
    /// back and is returned as the call's error.
    pub async fn execute_write_with(
        &self,
        sql_text: &str,
        params: &[Datum],
    ) -> Result<u64, SQLError> {
        self.execute_write_until(sql_text, params, self.default_deadline())
            .await
    }

    pub async fn execute_write_until(
        &self,
        sql_text: &str,
        params: &[Datum],
        deadline: Instant,
    ) -> Result<u64, SQLError> {
        self.ctx
            .logger
            .info(format_args!("Executing write: {}", sql_text));

        self.with_deadline(deadline, self.run_write(sql_text, params))
            .await
    }

    /// Write path for statements that hand rows back, such as
    /// `INSERT ... RETURNING`. Commits on success like
    /// [`Session::execute_write_with`].
    pub async fn execute_write_returning(
        &self,
        sql_text: &str,
        params: &[Datum],
    ) -> Result<QueryResult, SQLError> {
        self.ctx
            .logger
            .info(format_args!("Executing write: {}", sql_text));

        self.with_deadline(
            self.default_deadline(),
            self.run_write_returning(sql_text, params),
        )
        .await
    }

    fn default_deadline(&self) -> Instant {
        Instant::now() + self.ctx.statement_timeout
    }

    async fn with_deadline<T, F>(&self, deadline: Instant, work: F) -> Result<T, SQLError>
    where
        F: Future<Output = Result<T, SQLError>>,
    {
        match timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                self.ctx
                    .logger
                    .error(format_args!("Deadline passed; transaction rolled back"));
                Err(SQLError::new(
                    ErrorKind::TimeoutError,
                    "statement did not finish before its deadline",
                ))
            }
        }
    }

    async fn run_query(&self, sql_text: &str, params: &[Datum]) -> Result<QueryResult, SQLError> {
        let mut transaction = self.ctx.backend.begin().await?;

        let row_set = match transaction.query(sql_text, params).await {
            Ok(row_set) => row_set,
            Err(e) if e.is_rejection() => {
                self.ctx
                    .logger
                    .warn(format_args!("Statement rejected: {}", e.message));
                transaction.rollback().await?;
                return Ok(QueryResult::rejected(e.message));
            }
            Err(e) => {
                self.ctx.logger.error(format_args!("{}", e));
                return Err(e);
            }
        };

        let result = QueryResult::from_row_set(row_set);

        match classify(sql_text) {
            StatementKind::Read => transaction.commit().await?,
            StatementKind::Other => {
                self.ctx
                    .logger
                    .debug(format_args!("Not a SELECT; rolling back"));
                transaction.rollback().await?
            }
        }

        self.ctx.logger.debug(format_args!(
            "Returned {} row(s) over {} column(s)",
            result.row_count(),
            result.columns.len()
        ));
        Ok(result)
    }

    async fn run_write(&self, sql_text: &str, params: &[Datum]) -> Result<u64, SQLError> {
        let mut transaction = self.ctx.backend.begin().await?;

        match transaction.execute(sql_text, params).await {
            Ok(affected) => {
                transaction.commit().await?;
                self.ctx
                    .logger
                    .debug(format_args!("Committed; {} row(s) affected", affected));
                Ok(affected)
            }
            Err(e) => {
                self.ctx.logger.error(format_args!("Write failed: {}", e));
                if let Err(rollback) = transaction.rollback().await {
                    self.ctx
                        .logger
                        .error(format_args!("Rollback failed: {}", rollback));
                }
                Err(e)
            }
        }
    }

    async fn run_write_returning(
        &self,
        sql_text: &str,
        params: &[Datum],
    ) -> Result<QueryResult, SQLError> {
        let mut transaction = self.ctx.backend.begin().await?;

        match transaction.query(sql_text, params).await {
            Ok(row_set) => {
                transaction.commit().await?;
                Ok(QueryResult::from_row_set(row_set))
            }
            Err(e) => {
                self.ctx.logger.error(format_args!("Write failed: {}", e));
                if let Err(rollback) = transaction.rollback().await {
                    self.ctx
                        .logger
                        .error(format_args!("Rollback failed: {}", rollback));
                }
                Err(e)
            }
        }
    }
}
