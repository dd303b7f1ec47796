use super::{Experiment, ResultRecord, User};
use crate::{
    core::{Datum, ErrorKind, SQLError},
    sql::{builder::build_insert, Session},
};

pub const EXPERIMENTS: &str = "experiments";
pub const USERS: &str = "users";
pub const RESULTS: &str = "results";

const CREATE_EXPERIMENTS: &str = "\
CREATE TABLE IF NOT EXISTS experiments (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    user_percent INTEGER NOT NULL CHECK (user_percent BETWEEN 1 AND 100),
    algorithm_a VARCHAR(255) NOT NULL,
    algorithm_b VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (algorithm_a <> algorithm_b)
)";

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    experiment_id BIGINT NOT NULL REFERENCES experiments(id),
    user_id VARCHAR(255) NOT NULL,
    group_name VARCHAR(255) NOT NULL CHECK (group_name IN ('A', 'B'))
)";

const CREATE_RESULTS: &str = "\
CREATE TABLE IF NOT EXISTS results (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id),
    recommendation_id VARCHAR(255) NOT NULL,
    rating INTEGER NOT NULL DEFAULT 0 CHECK (rating BETWEEN 0 AND 5),
    clicked BOOLEAN NOT NULL DEFAULT FALSE,
    clicked_at TIMESTAMPTZ,
    CHECK (rating = 0 OR clicked),
    CHECK (clicked = (clicked_at IS NOT NULL))
)";

/// Creates the three entity tables, parents first. Existing tables are
/// left alone.
pub async fn create_tables(session: &Session) -> Result<(), SQLError> {
    for ddl in [CREATE_EXPERIMENTS, CREATE_USERS, CREATE_RESULTS] {
        session.execute_write(ddl).await?;
    }
    Ok(())
}

/// Validates and inserts an experiment, returning its new id.
pub async fn insert_experiment(session: &Session, experiment: &Experiment) -> Result<i64, SQLError> {
    experiment.validate()?;

    let sql = build_insert(
        EXPERIMENTS,
        &["name", "user_percent", "algorithm_a", "algorithm_b"],
        Some("id"),
    )?;
    let params = [
        Datum::from(experiment.name.trim()),
        Datum::from(experiment.user_percent),
        Datum::from(experiment.algorithm_a.trim()),
        Datum::from(experiment.algorithm_b.trim()),
    ];
    insert_returning_id(session, &sql, &params).await
}

pub async fn insert_user(session: &Session, user: &User) -> Result<i64, SQLError> {
    user.validate()?;

    let sql = build_insert(USERS, &["experiment_id", "user_id", "group_name"], Some("id"))?;
    let params = [
        Datum::from(user.experiment_id),
        Datum::from(user.user_id.as_str()),
        Datum::from(user.group()?.as_str()),
    ];
    insert_returning_id(session, &sql, &params).await
}

pub async fn insert_result(session: &Session, result: &ResultRecord) -> Result<i64, SQLError> {
    result.validate()?;

    let sql = build_insert(
        RESULTS,
        &["user_id", "recommendation_id", "rating", "clicked", "clicked_at"],
        Some("id"),
    )?;
    let params = [
        Datum::from(result.user_id),
        Datum::from(result.recommendation_id.as_str()),
        Datum::from(result.rating),
        Datum::from(result.clicked),
        Datum::from(result.click_time()),
    ];
    insert_returning_id(session, &sql, &params).await
}

async fn insert_returning_id(
    session: &Session,
    sql: &str,
    params: &[Datum],
) -> Result<i64, SQLError> {
    let result = session.execute_write_returning(sql, params).await?;

    match result.rows.first().and_then(|row| row.get("id")) {
        Some(Datum::Int(id)) => Ok(*id),
        _ => Err(SQLError::new(
            ErrorKind::ExecutionError,
            "insert did not return the new id",
        )),
    }
}
