//! Output formatting for command reports.

use crate::commands::{Report, Translation};
use crate::error::CliError;
use clap::ValueEnum;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text, SQL statements one per line
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &Report) -> String {
    match report {
        Report::Split { queries } if queries.is_empty() => "-- no persistent implementors".to_string(),
        Report::Split { queries } => queries.join("\n"),
        Report::Translation(translation) => render_translation(translation),
        Report::Ddl(ddl) if ddl.is_empty() => "-- no generator tables or sequences".to_string(),
        Report::Ddl(ddl) => {
            let create = ddl.create.iter().map(|s| format!("{};", s));
            let drop = ddl.drop.iter().map(|s| format!("{};", s));
            let mut lines: Vec<String> = drop.collect();
            lines.push(String::new());
            lines.extend(create);
            lines.join("\n")
        }
        Report::Parsed { ast } => ast.clone(),
    }
}

fn render_translation(translation: &Translation) -> String {
    let mut lines: Vec<String> = translation.sql.iter().map(|s| format!("{};", s)).collect();
    if let Some(role) = &translation.collection_role {
        lines.push(format!("-- filter on {}", role));
    }
    if !translation.query_spaces.is_empty() {
        lines.push(format!("-- tables: {}", translation.query_spaces.join(", ")));
    }
    if !translation.return_types.is_empty() {
        lines.push(format!("-- returns: {}", translation.return_types.join(", ")));
    }
    let mut parameters: Vec<String> = translation
        .named_parameters
        .iter()
        .map(|name| format!(":{}", name))
        .collect();
    parameters.extend((1..=translation.ordinal_parameters).map(|i| format!("?{}", i)));
    if !parameters.is_empty() {
        lines.push(format!("-- parameters: {}", parameters.join(", ")));
    }
    lines.join("\n")
}
