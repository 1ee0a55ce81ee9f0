use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] hql_core::Error),

    /// Parse failure, already rendered against the query text.
    #[error("{0}")]
    Parse(String),

    #[error("--mapping is required for this command")]
    MissingMapping,

    #[error("could not encode output: {0}")]
    Json(#[from] serde_json::Error),
}
