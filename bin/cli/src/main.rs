//! Interactive terminal client for sqlscout.
//!
//! Reads questions from stdin, answers them against the configured database
//! and streams the model's thinking and answer as they arrive.

mod config;
mod error;
mod openai;
mod terminal;

use crate::config::AppConfig;
use crate::error::CliError;
use crate::openai::OpenAiBackend;
use crate::terminal::TerminalDisplay;
use rootcause::prelude::Report;
use sqlscout_agent::{AgentContext, SessionDriver, SqlAgent, Transcript};
use sqlscout_database::SqliteDatabase;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Ask a question about the database. /clear forgets earlier questions, \
                    /quit exits, Ctrl-C stops the current answer.";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sqlscout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Report<CliError>> {
    let config = AppConfig::from_env().map_err(|e| CliError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(model = %config.model.model, "Loaded configuration");

    let database = SqliteDatabase::connect(&config.database_url)
        .await
        .map_err(|e| CliError::Database {
            reason: e.to_string(),
        })?
        .with_sample_rows(config.agent.sample_rows);
    let backend = OpenAiBackend::new(config.model).map_err(|e| CliError::Model {
        reason: e.to_string(),
    })?;
    let context = AgentContext::new(Arc::new(backend), Arc::new(database), config.agent)
        .map_err(|report| CliError::Agent {
            reason: report.to_string(),
        })?;
    let driver = SessionDriver::new(Arc::new(SqlAgent::new(context)));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = lines.next_line().await.map_err(|e| CliError::Terminal {
            reason: e.to_string(),
        })?;
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "" => {}
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/clear" => {
                driver.clear_memory().await;
                println!("Memory cleared.");
            }
            question => answer(&driver, question).await,
        }
    }
    Ok(())
}

async fn answer(driver: &SessionDriver, question: &str) {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut display = TerminalDisplay::new(std::io::stdout());
    let outcome = driver.ask(question, &mut display, &cancel).await;
    interrupt.abort();
    display.finish();

    match outcome {
        Ok(transcript) => show_executed_query(&transcript),
        Err(err) => {
            tracing::warn!(error = %err.report, "run failed");
            eprintln!("error: {}", err.report);
            show_executed_query(&err.partial);
        }
    }
}

fn show_executed_query(transcript: &Transcript) {
    match transcript.executed_query() {
        Ok(Some(sql)) => println!("\nExecuted SQL:\n{sql}\n"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not recover the executed query"),
    }
}
