#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use abadmin::{
    backend::{Backend, Transaction},
    core::{Datum, ErrorKind, RowSet, SQLError},
    sql::{session::context::QueryContext, Session},
    util::{Logger, MemoryLogger},
};
use async_trait::async_trait;
use sqlparser::{dialect::PostgreSqlDialect, parser::Parser};

/// What happened to the fake's transactions, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Begin,
    Query(String, Vec<Datum>),
    Execute(String, Vec<Datum>),
    Commit,
    Rollback,
    /// Dropped while still open.
    Abandoned,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    /// First entry whose needle the SQL contains answers the query.
    answers: Vec<(String, RowSet)>,
    rejections: Vec<(String, String)>,
    affected: u64,
    delay: Option<Duration>,
    refuse_begin: bool,
    /// Skip the sqlparser check, for SQL the server takes but sqlparser
    /// does not know.
    lenient: bool,
}

/// In-memory stand-in for a database engine. SQL that sqlparser cannot read
/// is rejected the way the engine would reject it.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<State>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, needle: &str, columns: &[&str], rows: Vec<Vec<Datum>>) -> Self {
        self.state.lock().unwrap().answers.push((
            needle.to_string(),
            RowSet {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        ));
        self
    }

    pub fn reject(self, needle: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejections
            .push((needle.to_string(), message.to_string()));
        self
    }

    pub fn affecting(self, rows: u64) -> Self {
        self.state.lock().unwrap().affected = rows;
        self
    }

    pub fn delayed(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn lenient(self) -> Self {
        self.state.lock().unwrap().lenient = true;
        self
    }

    /// Replaces every answer registered for `needle`.
    pub fn reanswer(&self, needle: &str, columns: &[&str], rows: Vec<Vec<Datum>>) {
        self.state
            .lock()
            .unwrap()
            .answers
            .retain(|(existing, _)| existing != needle);
        self.clone().answer(needle, columns, rows);
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().refuse_begin = true;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Events without the statement payloads.
    pub fn outline(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|event| match event {
                Event::Begin => "BEGIN",
                Event::Query(..) => "QUERY",
                Event::Execute(..) => "EXECUTE",
                Event::Commit => "COMMIT",
                Event::Rollback => "ROLLBACK",
                Event::Abandoned => "ABANDONED",
            })
            .collect()
    }

    pub fn statements(&self) -> Vec<(String, Vec<Datum>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Query(sql, params) | Event::Execute(sql, params) => Some((sql, params)),
                _ => None,
            })
            .collect()
    }

    pub fn session(&self) -> Session {
        self.session_with(Logger::discard())
    }

    pub fn session_with(&self, logger: Logger) -> Session {
        Session::new(QueryContext {
            backend: Box::new(self.clone()),
            logger,
            statement_timeout: Duration::from_secs(30),
        })
    }

    pub fn logged_session(&self) -> (Session, Arc<MemoryLogger>) {
        let memory = Arc::new(MemoryLogger::default());
        (self.session_with(Logger::new(memory.clone())), memory)
    }

    fn record(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }

    async fn run(&self, sql: &str) -> Result<RowSet, SQLError> {
        let (delay, lenient) = {
            let state = self.state.lock().unwrap();
            (state.delay, state.lenient)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !lenient {
            if let Err(e) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
                return Err(SQLError::new(ErrorKind::ExecutionError, e.to_string()));
            }
        }

        let state = self.state.lock().unwrap();
        if let Some((_, message)) = state
            .rejections
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
        {
            return Err(SQLError::new(ErrorKind::ExecutionError, message));
        }
        Ok(state
            .answers
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn begin(&self) -> Result<Box<dyn Transaction>, SQLError> {
        if self.state.lock().unwrap().refuse_begin {
            return Err(SQLError::new(ErrorKind::ConnectionError, "connection refused"));
        }
        self.record(Event::Begin);
        Ok(Box::new(ScriptedTransaction {
            backend: self.clone(),
            open: true,
        }))
    }
}

struct ScriptedTransaction {
    backend: ScriptedBackend,
    open: bool,
}

#[async_trait]
impl Transaction for ScriptedTransaction {
    async fn query(&mut self, sql: &str, params: &[Datum]) -> Result<RowSet, SQLError> {
        self.backend
            .record(Event::Query(sql.to_string(), params.to_vec()));
        self.backend.run(sql).await
    }

    async fn execute(&mut self, sql: &str, params: &[Datum]) -> Result<u64, SQLError> {
        self.backend
            .record(Event::Execute(sql.to_string(), params.to_vec()));
        self.backend.run(sql).await?;
        Ok(self.backend.state.lock().unwrap().affected)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), SQLError> {
        self.open = false;
        self.backend.record(Event::Commit);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), SQLError> {
        self.open = false;
        self.backend.record(Event::Rollback);
        Ok(())
    }
}

impl Drop for ScriptedTransaction {
    fn drop(&mut self) {
        if self.open {
            self.backend.record(Event::Abandoned);
        }
    }
}
