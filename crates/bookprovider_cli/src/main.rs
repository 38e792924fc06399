//! Command-line front end for the book provider.
//!
//! # Responsibility
//! - Map subcommands onto provider operations against one database file.
//! - Print results as JSON on stdout and errors on stderr.

mod args;

use args::{to_content_values, Cli, Command};
use bookprovider_core::{
    default_log_level, init_logging, BookProvider, BookQuery, ConfigError, LogNotifier,
    ProviderConfig, ProviderError, StoreLocation,
};
use clap::Parser;
use log::{error, info};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();
    let started_at = Instant::now();

    match run(cli) {
        Ok(output) => {
            info!(
                "event=cli_run module=cli status=ok command={} duration_ms={}",
                command,
                started_at.elapsed().as_millis()
            );
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_run module=cli status=error command={} duration_ms={} error_code={} error={}",
                command,
                started_at.elapsed().as_millis(),
                error_code(err.as_ref()),
                err
            );
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn error_code(err: &(dyn Error + 'static)) -> &'static str {
    if let Some(err) = err.downcast_ref::<ProviderError>() {
        return match err {
            ProviderError::UnrecognizedIdentifier { .. } => "unrecognized_uri",
            ProviderError::Validation(_) => "invalid_values",
            ProviderError::UnknownColumn(_) => "unknown_column",
            ProviderError::InvalidSortOrder(_) => "invalid_sort_order",
            ProviderError::InvalidSelection(_) => "invalid_selection",
            ProviderError::InsertFailed { .. } => "insert_failed",
            ProviderError::Store(_) => "store_failed",
            ProviderError::SchemaOpen(_) => "schema_open_failed",
            ProviderError::InvalidData(_) => "invalid_data",
        };
    }
    if err.is::<ConfigError>() {
        return "invalid_config";
    }
    if err.is::<serde_json::Error>() {
        return "output_failed";
    }
    "cli_failed"
}

fn run(cli: Cli) -> Result<Value, Box<dyn Error>> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(default_log_level(), log_dir)?;
    }

    let mut config = ProviderConfig::from_env()?;
    if let Some(path) = cli.db {
        config.location = StoreLocation::File(path);
    }
    let provider = BookProvider::open(config, LogNotifier)?;
    execute(&provider, cli.command)
}

fn execute(
    provider: &BookProvider<LogNotifier>,
    command: Command,
) -> Result<Value, Box<dyn Error>> {
    let output = match command {
        Command::Type { uri } => {
            let content_type = provider.get_type(&uri)?;
            json!({ "uri": uri, "type": content_type })
        }
        Command::Query {
            uri,
            columns,
            filter,
            sort,
        } => {
            let mut query = BookQuery::new().with_selection(filter.to_selection());
            if let Some(columns) = columns {
                query = query.with_projection(columns);
            }
            if let Some(sort) = sort {
                query = query.with_sort_order(sort);
            }

            let cursor = provider.query(&uri, &query)?;
            let rows = cursor
                .iter()
                .map(|row| {
                    let object = cursor
                        .columns()
                        .iter()
                        .zip(row.values())
                        .map(|(column, value)| {
                            Ok((column.to_string(), serde_json::to_value(value)?))
                        })
                        .collect::<Result<Map<String, Value>, serde_json::Error>>()?;
                    Ok(Value::Object(object))
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            Value::Array(rows)
        }
        Command::Insert { uri, values } => {
            let inserted = provider.insert(&uri, &to_content_values(&values))?;
            json!({ "uri": inserted.to_string(), "id": inserted.id() })
        }
        Command::Update {
            uri,
            values,
            filter,
        } => {
            let count =
                provider.update(&uri, &to_content_values(&values), &filter.to_selection())?;
            json!({ "uri": uri, "updated": count })
        }
        Command::Delete { uri, filter } => {
            let count = provider.delete(&uri, &filter.to_selection())?;
            json!({ "uri": uri, "deleted": count })
        }
    };
    Ok(output)
}
