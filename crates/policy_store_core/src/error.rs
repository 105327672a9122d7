use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures a policy store can report to the engine.
///
/// `Config` and the contract errors (`InvalidFilter`, `LengthMismatch`) are
/// raised before any statement executes; `Storage` wraps whatever the
/// database layer returned, tagged with the operation and table it came from.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration: {0}")]
    Config(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("batch length mismatch: {old} old rule(s) vs {new} new rule(s)")]
    LengthMismatch { old: usize, new: usize },

    #[error("storage failure in {op} on {table}: {source}")]
    Storage {
        op: &'static str,
        table: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Wrap a backend error with the operation and table it occurred in.
    pub fn storage(
        op: &'static str,
        table: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Storage {
            op,
            table: table.into(),
            source: source.into(),
        }
    }
}
