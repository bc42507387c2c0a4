use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, InvoiceError>;

#[derive(thiserror::Error, Debug)]
pub enum InvoiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse {}: {source}", path.display())]
    TomlRead {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Prompt cancelled: {0}")]
    Prompt(#[from] inquire::InquireError),
}

/// Reasons a tabular import is rejected. None of these touch the current draft.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("file must contain a header row and at least one data row")]
    TooFewLines,

    #[error("could not find a {0} column in the header")]
    MissingColumn(&'static str),

    #[error("no valid items found")]
    NoValidItems,
}
