//! hqlc - HQL query splitting and translation from the command line.
//!
//! Loads a JSON mapping document and optional Hibernate-style properties,
//! builds a session factory and prints the result of one command.

mod commands;
mod error;
mod formatter;

use clap::{Parser, Subcommand};
use error::CliError;
use formatter::OutputFormat;
use hql_core::SessionFactory;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// HQL translator
#[derive(Parser, Debug)]
#[command(name = "hqlc")]
#[command(version, about = "Split and translate HQL queries against a mapping")]
pub struct Args {
    /// Mapping document (JSON)
    #[arg(short, long, global = true)]
    pub mapping: Option<PathBuf>,

    /// Hibernate properties file
    #[arg(short, long, global = true)]
    pub properties: Option<PathBuf>,

    /// SQL dialect, overriding hibernate.dialect (postgresql, mysql, h2)
    #[arg(short, long, global = true)]
    pub dialect: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Expand a polymorphic query into one query per implementor
    Split { query: String },

    /// Translate a query to SQL
    Translate {
        query: String,

        /// Select identifiers only for entity results
        #[arg(long)]
        shallow: bool,
    },

    /// Translate a collection filter to SQL
    Filter {
        /// Collection role, e.g. `Kennel.dogs`
        #[arg(short, long)]
        role: String,

        filter: String,

        #[arg(long)]
        shallow: bool,
    },

    /// Print schema statements for identifier generator sequences and tables
    Ddl,

    /// Parse a query and print its syntax tree
    Parse { query: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    let report = match &args.command {
        Command::Split { query } => commands::split(&factory(&args)?, query)?,
        Command::Translate { query, shallow } => commands::translate(&factory(&args)?, query, *shallow)?,
        Command::Filter { role, filter, shallow } => {
            commands::filter(&factory(&args)?, filter, role, *shallow)?
        }
        Command::Ddl => commands::ddl(&factory(&args)?)?,
        Command::Parse { query } => commands::parse(query)?,
    };
    formatter::render(&report, args.format)
}

fn factory(args: &Args) -> Result<SessionFactory, CliError> {
    let mapping = args.mapping.as_deref().ok_or(CliError::MissingMapping)?;
    commands::load_factory(mapping, args.properties.as_deref(), args.dialect.as_deref())
}
