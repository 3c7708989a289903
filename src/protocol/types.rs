//! Protocol Reply Types
//!
//! This module defines [`Reply`], the tagged variant covering every value
//! the engine can hand back to a front end: status strings, stored values,
//! integers, the absent marker, error strings, and ordered sequences of
//! sub-replies (EXEC and COMPACT output).
//!
//! ## Wire Format
//!
//! The protocol is line-oriented plain text. Each scalar reply occupies one
//! line; a sequence is rendered as numbered lines:
//!
//! ```text
//! OK
//! (nil)
//! (error) ERR value is not an integer or out of range
//! 1) OK
//! 2) bar
//! ```

use crate::command::CommandError;
use std::fmt;

/// One protocol-visible result value.
///
/// Errors are ordinary replies, not exceptional control flow: a batched
/// EXEC reports a failing command's error string at its position in the
/// sequence without aborting the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Acknowledgement status: `OK` or `QUEUED`.
    Status(String),

    /// A stored value, returned verbatim.
    Value(String),

    /// An integer result (DEL returns 1 or 0).
    Integer(i64),

    /// The absent marker. Distinct from any stored value, including the
    /// empty string.
    Nil,

    /// A protocol-visible error, rendered as `(error) ERR ...`.
    Error(CommandError),

    /// An ordered sequence of sub-replies (EXEC, COMPACT).
    Many(Vec<Reply>),
}

impl Reply {
    /// The `OK` acknowledgement.
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// The `QUEUED` acknowledgement returned for commands buffered inside
    /// an open transaction.
    pub fn queued() -> Self {
        Reply::Status("QUEUED".to_string())
    }

    pub fn value(v: impl Into<String>) -> Self {
        Reply::Value(v.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Renders the reply as the bytes written back to the client, with a
    /// trailing newline per line. An empty sequence renders as nothing.
    pub fn render(&self) -> String {
        match self {
            Reply::Many(items) => {
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&format!("{}) {}\n", i + 1, item));
                }
                out
            }
            other => format!("{}\n", other),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Value(v) => write!(f, "{}", v),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Error(e) => write!(f, "{}", e),
            Reply::Many(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
