//! Error taxonomy for the classification pipeline
//!
//! Three families of failure exist here:
//! - recoverable, per-unit errors (`Parse`, `UnsupportedLanguage`,
//!   `EmptyUnit`) that a batch records and skips;
//! - fatal configuration errors (`ConfigMismatch`) that abort startup
//!   before any encode runs;
//! - ambient I/O and serialization errors from persistence.
//!
//! An unknown token is deliberately NOT an error: it resolves to the
//! vocabulary's reserved id (see `vocab::Vocabulary::id`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Source text is invalid for the declared grammar. Recoverable:
    /// the unit is skipped and the rest of the batch proceeds.
    #[error("parse error in {language} source: {detail}")]
    Parse { language: String, detail: String },

    /// File extension or language name outside the supported set.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The program produced no blocks (no function, class, loop, or
    /// other scope-opening construct). Nothing to encode.
    #[error("empty unit: source contains no scope-opening construct")]
    EmptyUnit,

    /// Dimension disagreement between vocabulary and weights. Fatal:
    /// raised at classifier construction, never mid-batch.
    #[error("config mismatch: {detail}")]
    ConfigMismatch { detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence error: {0}")]
    Persist(#[from] serde_json::Error),
}

impl Error {
    /// Whether a batch run may record this error and continue with the
    /// remaining units.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::UnsupportedLanguage(_) | Error::EmptyUnit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let parse = Error::Parse {
            language: "Python".into(),
            detail: "syntax error at row 3".into(),
        };
        assert!(parse.is_recoverable());
        assert!(Error::UnsupportedLanguage("brainfuck".into()).is_recoverable());
        assert!(Error::EmptyUnit.is_recoverable());

        let mismatch = Error::ConfigMismatch {
            detail: "embedding dim 128 vs vocabulary dim 64".into(),
        };
        assert!(!mismatch.is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::Parse {
            language: "Java".into(),
            detail: "unexpected token".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Java"));
        assert!(msg.contains("unexpected token"));
    }
}
