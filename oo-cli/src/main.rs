//! `oo` - command line front end for the OpenObserve REST API.
//!
//! Connection settings come from flags or the `OO_HOST`, `OO_USER`,
//! `OO_PASS` and `OO_ORG` environment variables.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use oo_client::frame::write_csv;
use oo_client::logging::setup::{init_logging, LoggingConfig};
use oo_client::prelude::*;
use serde_json::Value;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "oo", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Connection {
    /// OpenObserve base URL
    #[arg(long, env = "OO_HOST", default_value = "http://localhost:5080", global = true)]
    host: String,

    #[arg(long, env = "OO_USER", global = true)]
    user: Option<String>,

    #[arg(long, env = "OO_PASS", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Organisation
    #[arg(long = "org", env = "OO_ORG", default_value = "default", global = true)]
    organisation: String,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,
}

impl Connection {
    fn into_config(self) -> Result<ClientConfig> {
        let Some(user) = self.user else {
            bail!("missing user: pass --user or set OO_USER");
        };
        let Some(password) = self.password else {
            bail!("missing password: pass --password or set OO_PASS");
        };
        Ok(ClientConfig::new(user, password)
            .with_host(self.host)
            .with_organisation(self.organisation)
            .with_verify(!self.insecure))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a SQL search and print the hits as JSON lines
    Search {
        sql: String,

        /// Start of the range: RFC 3339 or epoch microseconds [default: 7 days ago]
        #[arg(long, value_parser = parse_time)]
        start: Option<TimeBound>,

        /// End of the range: RFC 3339 or epoch microseconds [default: now]
        #[arg(long, value_parser = parse_time)]
        end: Option<TimeBound>,

        /// Maximum number of hits
        #[arg(long)]
        limit: Option<u64>,

        /// Convert every field whose name contains "time" to a datetime
        #[arg(long)]
        auto_timestamps: bool,

        /// Convert this field to a datetime (repeatable)
        #[arg(long = "timestamp-column")]
        timestamp_columns: Vec<String>,

        /// Write the hits to a CSV file instead
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// List objects of a type
    List {
        #[arg(value_parser = parse_object_type)]
        object_type: ObjectType,

        /// Write the objects to a CSV file instead
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Ingest one JSON document into a stream
    Index {
        stream: String,
        document: String,

        /// Send RFC 3339 string values as epoch microseconds
        #[arg(long)]
        convert_datetimes: bool,
    },

    /// Delete objects of a type by name
    Delete {
        #[arg(value_parser = parse_object_type)]
        object_type: ObjectType,
        name: String,
    },

    /// Export the configuration below a path prefix
    Export {
        prefix: String,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// One file per object
        #[arg(long)]
        split: bool,

        /// With --split, do not create a directory per type
        #[arg(long)]
        flat: bool,

        /// Drop volatile fields such as stats and updated_at
        #[arg(long)]
        strip: bool,
    },

    /// Import configuration for one type or "all"
    Import {
        #[arg(value_parser = parse_import_target)]
        target: ImportTarget,
        path: String,

        /// Update objects that already exist
        #[arg(long)]
        overwrite: bool,

        /// Read one file per object from a directory
        #[arg(long)]
        split: bool,

        /// Skip alert id and name validation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

fn parse_object_type(s: &str) -> std::result::Result<ObjectType, String> {
    s.parse().map_err(|e: OpenObserveError| e.to_string())
}

fn parse_import_target(s: &str) -> std::result::Result<ImportTarget, String> {
    s.parse().map_err(|e: OpenObserveError| e.to_string())
}

fn parse_time(s: &str) -> std::result::Result<TimeBound, String> {
    if let Ok(micros) = s.parse::<i64>() {
        return Ok(TimeBound::Micros(micros));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| TimeBound::DateTime(dt.with_timezone(&Utc)))
        .map_err(|e| format!("'{s}' is neither RFC 3339 nor epoch microseconds: {e}"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &OpenObserveClient, command: Command) -> Result<()> {
    match command {
        Command::Search {
            sql,
            start,
            end,
            limit,
            auto_timestamps,
            timestamp_columns,
            csv,
        } => {
            let now = Utc::now();
            let mut query = SearchQuery::new(sql)
                .start(start.unwrap_or(TimeBound::DateTime(now - Duration::days(7))))
                .end(end.unwrap_or(TimeBound::DateTime(now)))
                .auto_convert_timestamps(auto_timestamps);
            if !timestamp_columns.is_empty() {
                query = query.timestamp_columns(timestamp_columns);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }

            match csv {
                Some(path) => {
                    let frame = client.search_frame(&query).await?;
                    write_csv(&frame, &path)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("{} rows written to {}", frame.num_rows(), path.display());
                }
                None => {
                    for hit in client.search(&query).await? {
                        println!("{}", Value::Object(hit));
                    }
                }
            }
        }
        Command::List { object_type, csv } => match csv {
            Some(path) => {
                let frame = client.list_objects_frame(object_type).await?;
                write_csv(&frame, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("{} rows written to {}", frame.num_rows(), path.display());
            }
            None => print_json(&client.list_objects(object_type).await?)?,
        },
        Command::Index {
            stream,
            document,
            convert_datetimes,
        } => {
            let document: Value =
                serde_json::from_str(&document).context("document is not valid JSON")?;
            print_json(
                &client
                    .index_with(&stream, &document, convert_datetimes)
                    .await?,
            )?;
        }
        Command::Delete { object_type, name } => {
            let deleted = client.delete_object_by_name(object_type, &name).await?;
            if deleted == 0 {
                bail!("no {object_type} named '{name}'");
            }
            eprintln!("{deleted} {object_type} deleted");
        }
        Command::Export {
            prefix,
            format,
            split,
            flat,
            strip,
        } => {
            let options = ExportOptions { flat, strip };
            let written = client
                .config_export(&prefix, format.into(), split, options)
                .await?;
            eprintln!("{written} files written");
        }
        Command::Import {
            target,
            path,
            overwrite,
            split,
            force,
        } => {
            let options = ImportOptions { overwrite, force };
            let report = client.config_import(target, &path, options, split).await?;
            eprintln!("{report}");
            if !report.is_success() {
                for (object, error) in &report.failed {
                    eprintln!("  {object}: {error}");
                }
                bail!("{} object(s) failed to import", report.failed.len());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_verbosity(cli.verbose).with_json_format(cli.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("failed to initialize logging: {e}");
    }

    let config = cli.connection.into_config()?;
    debug!(host = config.host(), org = config.organisation(), "connecting");
    let client = OpenObserveClient::new(config).context("failed to create client")?;

    run(&client, cli.command).await
}
