//! nl2sql - ask a PostgreSQL database questions in plain language.

use std::sync::Arc;

use nl2sql_agent::cli::{Cli, Command};
use nl2sql_agent::config::Config;
use nl2sql_agent::db::{self, introspect_schema, DatabaseClient, MockDatabaseClient};
use nl2sql_agent::error::Result;
use nl2sql_agent::llm::create_client;
use nl2sql_agent::logging;
use nl2sql_agent::pipeline::Pipeline;
use nl2sql_agent::server;
use tracing::{debug, error, info};

#[actix_web::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    if let Some(provider) = &cli.llm {
        config.llm.provider = provider.clone();
    }

    match &cli.command {
        Command::Schema => {
            let db = open_database(&cli, &config).await?;
            println!("{}", introspect_schema(db.as_ref()).await);
            db.close().await?;
        }
        Command::Ask { show_sql, .. } => {
            // A missing API key fails before the database is touched.
            let llm = create_client(&config.llm)?;
            let pipeline = Pipeline::new(open_database(&cli, &config).await?, llm);
            let question = cli.command.question().unwrap_or_default();
            let state = pipeline.run_once(&question).await?;

            if *show_sql {
                println!("SQL:\n{}\n", state.sql_text()?);
                println!("Result:\n{}\n", state.execution_result()?);
            }
            println!("{}", state.final_answer()?);
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }

            let llm = create_client(&config.llm)?;
            let pipeline = Pipeline::new(open_database(&cli, &config).await?, llm);
            let served = server::run(pipeline.clone(), &config.server).await;
            pipeline.close().await?;
            served?;
        }
    }

    Ok(())
}

/// Opens the PostgreSQL database, or the in-memory demo with `--mock-db`.
async fn open_database(cli: &Cli, config: &Config) -> Result<Arc<dyn DatabaseClient>> {
    if cli.mock_db {
        info!("Using in-memory demo database");
        return Ok(Arc::new(MockDatabaseClient::demo()));
    }

    let client = db::connect(&config.database, cli.database_url.as_deref()).await?;
    Ok(Arc::new(client))
}
