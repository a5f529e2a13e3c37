//! Named-pattern matching: a library of reusable fragments, a compiler that
//! expands `%{NAME[:ALIAS] [PREDICATE]}` references into one regex, and the
//! match engine that applies predicates to its results.

pub mod compiler;
pub mod error;
pub mod lexer;
pub mod library;
pub mod matcher;
pub mod predicate;

pub use compiler::Compiler;
pub use error::{CompileError, LibraryError, PredicateParseError};
pub use library::{BUILTIN_PATTERNS, DEFAULT_PATTERN_GLOB, Library, LibraryConfig};
pub use matcher::{CompiledPattern, DegradedPredicate, GrokMatch, NamedCapture};
pub use predicate::{CompareOp, Number, Predicate};
