//! CLI argument definitions.

use bookprovider_core::{ContentValues, FieldValue, Selection};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Query and edit a book store through `content://` identifiers.
#[derive(Parser, Debug)]
#[command(name = "bookprovider")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database file; overrides `BOOKPROVIDER_DB_PATH`.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Absolute directory for rotating log files. Logging is off when unset.
    #[arg(long, global = true, env = "BOOKPROVIDER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the content kind of an identifier
    Type { uri: String },

    /// Print matching books as JSON
    Query {
        uri: String,
        /// Comma-separated column names
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        #[command(flatten)]
        filter: FilterArgs,
        /// e.g. `created_at DESC, name`
        #[arg(long)]
        sort: Option<String>,
    },

    /// Insert one book and print its identifier
    Insert {
        uri: String,
        /// `column=value` pairs
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, FieldValue)>,
    },

    /// Update matching books and print the affected count
    Update {
        uri: String,
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, FieldValue)>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Delete matching books and print the removed count
    Delete {
        uri: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

impl Command {
    /// Subcommand name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Type { .. } => "type",
            Self::Query { .. } => "query",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// SQL filter with `?` placeholders
    #[arg(long = "where")]
    pub clause: Option<String>,
    /// Value bound to the next `?`, in order
    #[arg(long = "arg", value_parser = parse_value)]
    pub args: Vec<FieldValue>,
}

impl FilterArgs {
    pub fn to_selection(&self) -> Selection {
        match &self.clause {
            Some(clause) => Selection::new(clause.clone(), self.args.clone()),
            None => Selection::all(),
        }
    }
}

pub fn to_content_values(values: &[(String, FieldValue)]) -> ContentValues {
    let mut content = ContentValues::new();
    for (key, value) in values {
        content.put(key.clone(), value.clone());
    }
    content
}

/// `null` becomes NULL, integers stay integers, everything else is text.
fn parse_value(raw: &str) -> Result<FieldValue, String> {
    if raw == "null" {
        return Ok(FieldValue::Null);
    }
    Ok(match raw.parse::<i64>() {
        Ok(value) => FieldValue::Integer(value),
        Err(_) => FieldValue::Text(raw.to_string()),
    })
}

fn parse_assignment(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing column name in `{raw}`"));
    }
    Ok((key.to_string(), parse_value(value)?))
}
