use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Schema mismatch: {path} has a different column set than {first_path}")]
    SchemaMismatch { first_path: String, path: String },

    #[error("Missing column {column} in {context}")]
    MissingColumn { column: String, context: String },

    #[error("Ambiguous reference: key {key} maps to more than one reference row")]
    AmbiguousReference { key: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, EtlError>;
