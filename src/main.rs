use std::{io, process::ExitCode};

use abadmin::{
    backend::PgBackend,
    cli::CliApp,
    config::Config,
    sql::{session::context::QueryContext, Session},
    util::Logger,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let logger = Logger::stderr(config.log_level);

    let backend = match PgBackend::connect(&config, logger.clone()).await {
        Ok(backend) => backend,
        Err(e) => {
            logger.error(format_args!("{}", e));
            return ExitCode::FAILURE;
        }
    };
    logger.info(format_args!(
        "Connected to {}:{}/{} as {}",
        config.host, config.port, config.dbname, config.user
    ));

    let query_ctx = QueryContext {
        backend: Box::new(backend),
        logger: logger.clone(),
        statement_timeout: config.statement_timeout,
    };
    let session = Session::new(query_ctx);

    let stdin = io::stdin();
    let mut app = CliApp::new(session, config.schema.clone(), stdin.lock(), io::stdout());
    if let Err(e) = app.run().await {
        logger.error(format_args!("{}", e));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
