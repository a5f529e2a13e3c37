//! Typed guards attached to references.
//!
//! - numeric: `< > <= >= == !=` followed by an integer or float operand
//! - string:  the same operators prefixed with `$`, compared lexically
//! - regex:   `=~ /re/` or `!~ /re/`, search semantics
//!
//! The family is resolved once at compile time; evaluation never fails and
//! treats anything it cannot interpret as "predicate false".

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::error::PredicateParseError;

static OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\$)?(<=|>=|==|!=|<|>|=~|!~)\s*").expect("operator regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn from_token(token: &str) -> Option<CompareOp> {
        match token {
            "<" => Some(CompareOp::Lt),
            ">" => Some(CompareOp::Gt),
            "<=" => Some(CompareOp::Le),
            ">=" => Some(CompareOp::Ge),
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Apply the operator to `lhs OP rhs`. Unordered values (NaN) are false.
    pub fn apply<T: PartialOrd + ?Sized>(&self, lhs: &T, rhs: &T) -> bool {
        let Some(ordering) = lhs.partial_cmp(rhs) else {
            return false;
        };
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric operand; the subtype decides how captured text is cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn parse(operand: &str) -> Result<Number, PredicateParseError> {
        let invalid = || PredicateParseError::InvalidNumber(operand.to_string());
        if operand.contains('.') {
            operand.parse().map(Number::Float).map_err(|_| invalid())
        } else {
            operand.parse().map(Number::Int).map_err(|_| invalid())
        }
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Numeric { op: CompareOp, operand: Number },
    String { op: CompareOp, operand: String },
    Regex { pattern: fancy_regex::Regex, negate: bool },
}

impl Predicate {
    /// Parse a predicate clause such as `>= 10`, `$== GET` or `!~ /^tmp/`.
    pub fn parse(clause: &str) -> Result<Predicate, PredicateParseError> {
        let Some(caps) = OPERATOR.captures(clause) else {
            return Err(PredicateParseError::UnknownOperator(clause.to_string()));
        };
        let string_compare = caps.get(1).is_some();
        let token = caps.get(2).map_or("", |m| m.as_str());
        let operand = clause[caps.get(0).map_or(0, |m| m.end())..].trim_end();

        if token == "=~" || token == "!~" {
            if string_compare {
                return Err(PredicateParseError::UnknownOperator(clause.to_string()));
            }
            return Self::parse_regex(operand, token == "!~");
        }

        let Some(op) = CompareOp::from_token(token) else {
            return Err(PredicateParseError::UnknownOperator(clause.to_string()));
        };
        if operand.is_empty() {
            return Err(PredicateParseError::MissingOperand);
        }

        if string_compare {
            Ok(Predicate::String {
                op,
                operand: operand.to_string(),
            })
        } else {
            Ok(Predicate::Numeric {
                op,
                operand: Number::parse(operand)?,
            })
        }
    }

    /// `operand` is `/body/`: the first character is the delimiter and the
    /// body runs to its last occurrence.
    fn parse_regex(operand: &str, negate: bool) -> Result<Predicate, PredicateParseError> {
        let mut chars = operand.chars();
        let Some(delimiter) = chars.next() else {
            return Err(PredicateParseError::MissingOperand);
        };
        let rest = chars.as_str();
        let Some(close) = rest.rfind(delimiter) else {
            return Err(PredicateParseError::UnterminatedRegex);
        };
        let trailing = rest[close + delimiter.len_utf8()..].trim();
        if !trailing.is_empty() {
            return Err(PredicateParseError::TrailingText(trailing.to_string()));
        }

        let pattern = fancy_regex::Regex::new(&rest[..close])
            .map_err(|e| PredicateParseError::InvalidRegex(e.to_string()))?;
        Ok(Predicate::Regex { pattern, negate })
    }

    /// Evaluate against the text captured by the guarded reference.
    pub fn evaluate(&self, captured: &str) -> bool {
        match self {
            Predicate::Numeric { op, operand } => {
                let Ok(value) = captured.trim().parse::<f64>() else {
                    return false;
                };
                match operand {
                    Number::Float(rhs) => op.apply(&value, rhs),
                    Number::Int(rhs) => {
                        if !value.is_finite() {
                            return false;
                        }
                        // Integer predicates truncate the captured value.
                        op.apply(&(value.trunc() as i64), rhs)
                    }
                }
            }
            Predicate::String { op, operand } => op.apply(captured, operand.as_str()),
            Predicate::Regex { pattern, negate } => match pattern.is_match(captured) {
                Ok(found) => found != *negate,
                Err(_) => false,
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Numeric {
                op,
                operand: Number::Int(n),
            } => write!(f, "{op} {n}"),
            Predicate::Numeric {
                op,
                operand: Number::Float(n),
            } => write!(f, "{op} {n:?}"),
            Predicate::String { op, operand } => write!(f, "${op} {operand}"),
            Predicate::Regex { pattern, negate } => {
                let op = if *negate { "!~" } else { "=~" };
                write!(f, "{op} /{}/", pattern.as_str())
            }
        }
    }
}
