//! Runs against a real server only when `ABADMIN_TEST_LIVE` is set; the
//! connection itself comes from the usual `ABADMIN_*` variables.

use std::time::Duration;

use abadmin::{
    backend::PgBackend,
    config::Config,
    core::ErrorKind,
    sql::{session::context::QueryContext, Session},
    util::Logger,
};
use tokio::time::Instant;

async fn live_session() -> Option<Session> {
    std::env::var_os("ABADMIN_TEST_LIVE")?;

    let mut config = Config::from_env().unwrap();
    // One connection, so the follow-up call must reuse the abandoned one.
    config.pool_size = 1;
    let backend = PgBackend::connect(&config, Logger::discard()).await.unwrap();

    Some(Session::new(QueryContext {
        backend: Box::new(backend),
        logger: Logger::discard(),
        statement_timeout: Duration::from_secs(30),
    }))
}

#[tokio::test]
async fn deadline_cancels_the_running_statement() {
    let Some(session) = live_session().await else {
        return;
    };

    let err = session
        .execute_until(
            "SELECT pg_sleep(600)",
            &[],
            Instant::now() + Duration::from_millis(500),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TimeoutError);

    let started = Instant::now();
    let result = session
        .execute_until("SELECT 1", &[], Instant::now() + Duration::from_secs(20))
        .await
        .unwrap();
    assert!(result.is_ok());
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[tokio::test]
async fn select_one_round_trips() {
    let Some(session) = live_session().await else {
        return;
    };

    let result = session.execute("SELECT 1 AS one").await.unwrap();
    assert_eq!(result.columns, vec!["one".to_string()]);
    assert_eq!(result.row_count(), 1);

    let result = session.execute("SELEKT 1").await.unwrap();
    assert!(result.error.is_some());
}
