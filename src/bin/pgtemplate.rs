//! pgtemplate: render SQL templates from the command line
//!
//! # Usage
//!
//! ```bash
//! # Render a template file with named parameters
//! pgtemplate render report.sql -p table=events -p since=2024-01-01
//!
//! # Positional template
//! pgtemplate inline 'SELECT * FROM %I WHERE id = %L' users 42
//!
//! # Render and run it
//! pgtemplate render report.sql -p table=events --database-url postgres://localhost/db
//! ```

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::*;
use pgtemplate::parser::extract_tokens;
use pgtemplate::prelude::*;
use pgtemplate::runner::RowMap;
use pgtemplate::value::params_from_json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pgtemplate")]
#[command(version)]
#[command(about = "Render SQL templates with named parameters and file includes", long_about = None)]
#[command(after_help = "EXAMPLES:
    pgtemplate render daily.sql -p table=events -p day=2016-09-01
    pgtemplate render daily.sql --params-json params.json --dry-run
    pgtemplate inline 'SELECT %I FROM %I WHERE id = %L' name users 7
    pgtemplate tokens daily.sql --expand")]
struct Cli {
    /// Config file (default: ./pgtemplate.toml, then the user config directory)
    #[arg(long, global = true, env = "PGTEMPLATE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template file with named parameters
    Render {
        /// The template file
        file: PathBuf,

        /// Named parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// JSON object file with named parameters; --param entries override it
        #[arg(long)]
        params_json: Option<PathBuf>,

        /// Don't execute, just show the rendered SQL
        #[arg(short, long)]
        dry_run: bool,

        /// Database connection URL
        #[arg(long, env = "PGTEMPLATE_DATABASE_URL")]
        database_url: Option<String>,

        /// Run as a statement and report affected rows instead of fetching rows
        #[arg(short = 'x', long)]
        execute: bool,

        /// Output format for fetched rows
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write the rendered SQL to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render an inline template with positional arguments
    Inline {
        /// The template text
        template: String,

        /// Positional arguments, in marker order
        args: Vec<String>,
    },
    /// List the placeholder tokens of a template file
    Tokens {
        /// The template file
        file: PathBuf,

        /// Expand includes first
        #[arg(long)]
        expand: bool,
    },
    /// Show the marker reference
    Markers,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose >= 2))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FormatterConfig::from_file(path)?,
        None => FormatterConfig::discover()?,
    };
    let formatter = Formatter::from_config(config);

    match cli.command {
        Commands::Render {
            file,
            params,
            params_json,
            dry_run,
            database_url,
            execute,
            format,
            output,
        } => {
            let params = collect_params(params, params_json.as_deref())?;
            let sql = formatter
                .format_file(&file, &params)
                .with_context(|| format!("failed to render {}", file.display()))?;

            if let Some(path) = output {
                std::fs::write(&path, &sql)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("{} Wrote SQL to {}", "✓".green(), path.display().to_string().cyan());
                if database_url.is_none() || dry_run {
                    return Ok(());
                }
            }

            let Some(url) = database_url.filter(|_| !dry_run) else {
                println!("{}", sql);
                return Ok(());
            };

            run_sql(&url, &sql, execute, &format).await
        }
        Commands::Inline { template, args } => {
            let args: Vec<SqlValue> = args.iter().map(|a| SqlValue::infer(a)).collect();
            println!("{}", formatter.format_positional(&template, &args)?);
            Ok(())
        }
        Commands::Tokens { file, expand } => show_tokens(&formatter, &file, expand),
        Commands::Markers => {
            show_markers();
            Ok(())
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn collect_params(pairs: Vec<(String, String)>, json: Option<&Path>) -> anyhow::Result<Params> {
    let mut params = match json {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", path.display()))?;
            params_from_json(value)?
        }
        None => Params::new(),
    };

    for (key, value) in pairs {
        params.insert(key, SqlValue::infer(&value));
    }
    Ok(params)
}

async fn run_sql(url: &str, sql: &str, execute: bool, format: &OutputFormat) -> anyhow::Result<()> {
    tracing::info!("connecting to {}", url);
    let runner = SqlRunner::connect(url).await?;

    if execute {
        let affected = runner.execute(sql).await?;
        println!("{} {} rows affected", "✓".green(), affected);
    } else {
        let results = runner.fetch_all(sql).await?;
        format_output(&results, format);
    }
    Ok(())
}

fn format_output(rows: &[RowMap], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
        return;
    }

    let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell_text(row.get(*c))).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .fold(c.chars().count(), usize::max)
        })
        .collect();

    let pad = |text: &str, i: usize| format!("{:width$}", text, width = widths[i]);
    let header: Vec<String> = columns.iter().enumerate().map(|(i, c)| pad(*c, i)).collect();
    println!("{}", header.join(" │ ").white().bold());
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", rule.join("─┼─").dimmed());

    for row in &cells {
        let line: Vec<String> = row.iter().enumerate().map(|(i, v)| pad(v.as_str(), i)).collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

/// Table text for a JSON cell; missing and `null` cells print as `NULL`.
fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "NULL".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn show_tokens(formatter: &Formatter, file: &Path, expand: bool) -> anyhow::Result<()> {
    let mut text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    if expand {
        let base_dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        text = formatter.expand(&text, &base_dir)?;
    }

    let tokens = extract_tokens(&text);
    if tokens.is_empty() {
        println!("{}", "(no placeholders)".dimmed());
        return Ok(());
    }

    println!(
        "{:10} {:20} {:12} {}",
        "Position".white().bold(),
        "Token".white().bold(),
        "Kind".white().bold(),
        "Binds".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    for token in &tokens {
        let (line, col) = line_col(&text, token.span.start);
        let kind = match token.marker {
            Marker::Identifier => "identifier",
            Marker::Literal => "literal",
            Marker::String => "string",
            Marker::File => "include",
            Marker::Percent => "percent",
        };
        let binds = match (token.name, token.position) {
            (Some(name), _) if token.is_include() => {
                format!("{}.{}", name, formatter.config().include_extension)
            }
            (Some(name), _) => format!(":{}", name),
            (None, Some(n)) => format!("${}", n),
            (None, None) => "next".to_string(),
        };
        println!(
            "{:10} {:20} {:12} {}",
            format!("{}:{}", line, col).dimmed(),
            token.to_string().cyan().bold(),
            kind.yellow(),
            binds
        );
    }

    let values: Vec<_> = tokens.iter().filter(|t| t.marker.takes_value()).collect();
    let named = values.iter().filter(|t| t.is_named()).count();
    if named > 0 && named < values.len() {
        println!();
        println!(
            "{}",
            "⚠ Template mixes named and unnamed placeholders; named rendering will fail".yellow()
        );
    } else if named == 0 && !values.is_empty() {
        println!();
        println!("{}", "Positional template: render it with `pgtemplate inline`".dimmed());
    }
    Ok(())
}

/// 1-based line and column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) + 1;
    (line, col)
}

fn show_markers() {
    println!("{}", "pgtemplate Marker Reference".cyan().bold());
    println!();

    let markers = [
        ("%I", "Identifier", "Quoted if needed", "\"Users\", events"),
        ("%L", "Literal", "Quoted value", "'O''Brien', NULL"),
        ("%s", "String", "Inserted as-is", "a = b"),
        ("%F:name", "Include", "Splices name.sql", "(file contents)"),
        ("%%", "Percent", "Escaped percent sign", "%"),
        (":name", "Named", "Suffix binding by name", "%L:start_time"),
        ("%n$", "Position", "Picks argument n", "%2$L"),
    ];

    println!(
        "{:10} {:12} {:25} {}",
        "Marker".white().bold(),
        "Name".white().bold(),
        "Function".white().bold(),
        "Example Output".white().bold()
    );
    println!("{}", "─".repeat(70).dimmed());

    for (marker, name, function, example) in markers {
        println!(
            "{:10} {:12} {:25} {}",
            marker.cyan().bold(),
            name.yellow(),
            function.white(),
            example.dimmed()
        );
    }
}
