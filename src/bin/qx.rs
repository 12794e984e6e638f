//! qx: compile and run `?`-template queries.
//!
//! # Usage
//!
//! ```bash
//! # Show the compiled SQL and arguments
//! qx "SELECT uid, email FROM public.users WHERE uid = ?" --bind 42 --dry-run
//!
//! # Execute against PostgreSQL
//! qx "SELECT uid FROM public.users WHERE email ILIKE ?" --bind %bob% --database-url postgres://localhost/app
//!
//! # Inspect how a template is split
//! qx explain "data ?? ? AND id = ?"
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qx::ast::template::segments;
use qx::config::Config;
use qx::engine::{Database, Row};
use qx::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qx")]
#[command(version)]
#[command(about = "Compile `?`-template queries to parameterized PostgreSQL", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    qx 'SELECT uid FROM public.users WHERE uid = ?' --bind 42 --dry-run
    qx 'SELECT uid FROM public.users WHERE uid IN (?, ?)' --bind 1,2
    qx explain 'TRIM(?)::INT > ?'")]
struct Cli {
    /// The query template; each `?` takes the next binding, `??` is a literal `?`
    template: Option<String>,

    /// Don't execute, just show the compiled SQL and arguments
    #[arg(short, long)]
    dry_run: bool,

    /// Values for the `?` markers, in order
    #[arg(short, long, value_delimiter = ',')]
    bind: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Database connection URL
    #[arg(long, env = "QX_DATABASE_URL")]
    database_url: Option<String>,

    /// Config file (default: ./qx.toml, then the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a template is split into text and markers
    Explain {
        /// The query template
        template: String,
    },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_database_url(cli.database_url.clone());
    init_tracing(&config, cli.verbose);

    match &cli.command {
        Some(Commands::Explain { template }) => explain_template(template),
        Some(Commands::Config) => print!("{}", config.to_toml()?),
        None => match &cli.template {
            Some(template) => {
                if let Err(e) = execute_template(template, &cli, &config).await {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(1);
                }
            }
            None => {
                println!("{}", "qx: parameterized PostgreSQL from ? templates".cyan().bold());
                println!();
                println!("Usage: qx <TEMPLATE> [OPTIONS]");
                println!();
                println!("Try: qx --help");
            }
        },
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level, or `debug` with `--verbose`.
fn init_tracing(config: &Config, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a binding the way a shell user means it: integer, float, bool, else text.
fn parse_binding(binding: &str) -> Value {
    if let Ok(n) = binding.parse::<i64>() {
        Value::Int(n)
    } else if let Ok(f) = binding.parse::<f64>() {
        Value::Float(f)
    } else if binding == "true" {
        Value::Bool(true)
    } else if binding == "false" {
        Value::Bool(false)
    } else {
        Value::String(binding.to_string())
    }
}

async fn execute_template(template: &str, cli: &Cli, config: &Config) -> QxResult<()> {
    if cli.verbose {
        println!("{} {}", "Input:".dimmed(), template.yellow());
    }

    let parts: Vec<Part> = cli.bind.iter().map(|b| Part::Value(parse_binding(b))).collect();
    let query = RawQuery::parse(template, parts)?;
    let (sql, args) = query.to_sql();

    let url = config.database.url.as_deref();
    if cli.dry_run || url.is_none() {
        println!("{}", "Generated SQL:".green().bold());
        println!("{}", sql.white());

        if !args.is_empty() {
            println!();
            println!("{}", "Arguments:".cyan());
            for (i, arg) in args.iter().enumerate() {
                println!("  ${} = {}", i + 1, arg.to_string().yellow());
            }
        }

        if url.is_none() && !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No database URL. Use --database-url, QX_DATABASE_URL or database.url in qx.toml"
                    .yellow()
            );
        }
        return Ok(());
    }

    let db = Database::connect_with(config).await?;
    let rows = db.fetch_all(&query).await?;
    format_output(&rows, &cli.format);
    Ok(())
}

fn format_output(rows: &[Row], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            let objects: Vec<serde_json::Map<String, serde_json::Value>> =
                rows.iter().map(|row| row.iter().cloned().collect()).collect();
            println!("{}", serde_json::to_string_pretty(&objects).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns: Vec<&str> = rows[0].iter().map(|(name, _)| name.as_str()).collect();

            let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
            for row in rows {
                for (i, (_, val)) in row.iter().enumerate() {
                    if let Some(w) = widths.get_mut(i) {
                        *w = (*w).max(val_to_string(val).len());
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|((_, val), w)| format!("{:width$}", val_to_string(val), width = w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn explain_template(template: &str) {
    println!("{} {}", "Template:".dimmed(), template.yellow());
    println!();

    let segments = segments(template);
    let markers = segments.iter().filter(|s| **s == Segment::Marker).count();

    println!("{}", "Segments:".green().bold());
    let mut marker = 0;
    for segment in &segments {
        match segment {
            Segment::Text(text) => println!("  {} {:?}", "text  ".dimmed(), text),
            Segment::Marker => {
                marker += 1;
                println!("  {} ${}", "marker".cyan(), marker);
            }
        }
    }
    println!();
    println!("{} binding(s) expected", markers.to_string().cyan());
}
