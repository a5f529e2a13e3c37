use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a symbolic pattern into a matcher.
///
/// A compile error only affects the call that produced it: the library and
/// patterns compiled earlier stay usable.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown pattern %{{{name}}} referenced in `{pattern}`")]
    UnknownPattern { name: String, pattern: String },

    #[error("malformed reference at offset {offset} in `{pattern}`: {reason}")]
    MalformedReference {
        pattern: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("reference cycle in `{pattern}`: {}", path.join(" -> "))]
    Cycle { pattern: String, path: Vec<String> },

    #[error("group name `{name}` in `{pattern}` is reserved for expanded references")]
    GroupCollision { pattern: String, name: String },

    #[error("invalid regex for `{pattern}`: {message}")]
    Regex { pattern: String, message: String },
}

/// Why a predicate clause was ignored.
///
/// These never fail compilation; the reference falls back to an
/// unconditional structural match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateParseError {
    #[error("unknown predicate operator in `{0}`")]
    UnknownOperator(String),

    #[error("predicate operator has no operand")]
    MissingOperand,

    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("regex predicate is missing its closing delimiter")]
    UnterminatedRegex,

    #[error("unexpected text after regex predicate: `{0}`")]
    TrailingText(String),

    #[error("invalid predicate regex: {0}")]
    InvalidRegex(String),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("pattern {0} is not defined")]
    NotFound(String),

    #[error("failed to read pattern definitions from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern file glob `{glob}`: {message}")]
    Glob { glob: String, message: String },
}
