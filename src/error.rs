//! Error types for the adapters around the core.
//!
//! The ring and the book never fail; only I/O and parsing do.

/// Errors raised by feeds, symbols and the replay tooling
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid quote on line {line}: {reason}")]
    InvalidQuote { line: u64, reason: String },

    #[error("symbol too long: {0:?}")]
    SymbolTooLong(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
