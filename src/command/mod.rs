//! Command Representation and Validation
//!
//! A [`Command`] is one parsed client request: an operation tag plus up to
//! two positional arguments (key and value). Commands are built once from a
//! tokenized input line, validated before dispatch, and consumed exactly once
//! by the engine (or held in the transaction queue until EXEC/DISCARD).
//!
//! Validation failures and engine-level failures share one error taxonomy,
//! [`CommandError`]. These errors are protocol-visible result values, not
//! exceptional control flow: the engine returns them as ordinary replies so
//! a batched EXEC can report per-command failures positionally.

use thiserror::Error;

/// The set of operations the engine understands.
///
/// Tags are matched case-insensitively at the protocol boundary; anything
/// outside the known set is carried as `Unknown` and rejected by
/// [`Command::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Set,
    Get,
    Del,
    Incr,
    IncrBy,
    Multi,
    Exec,
    Discard,
    Compact,
    Select,
    Unknown(String),
}

impl Operation {
    /// Parses an operation tag, normalizing to uppercase.
    pub fn parse(tag: &str) -> Self {
        match tag.to_uppercase().as_str() {
            "SET" => Operation::Set,
            "GET" => Operation::Get,
            "DEL" => Operation::Del,
            "INCR" => Operation::Incr,
            "INCRBY" => Operation::IncrBy,
            "MULTI" => Operation::Multi,
            "EXEC" => Operation::Exec,
            "DISCARD" => Operation::Discard,
            "COMPACT" => Operation::Compact,
            "SELECT" => Operation::Select,
            other => Operation::Unknown(other.to_string()),
        }
    }

    /// The lowercased name used in arity error messages.
    fn arity_name(&self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Del => "del",
            Operation::Incr => "incr",
            Operation::IncrBy => "incrby",
            Operation::Multi => "multi",
            Operation::Exec => "exec",
            Operation::Discard => "discard",
            Operation::Compact => "compact",
            Operation::Select => "select",
            Operation::Unknown(_) => "unknown",
        }
    }
}

/// Errors surfaced to clients as `(error) ERR ...` result strings.
///
/// These never cross the engine boundary as `Err`; they travel inside
/// [`crate::protocol::Reply::Error`] so transaction batches can mix
/// successes and failures in one positional sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// An operation was given the wrong number of arguments.
    #[error("(error) ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// The operation tag is not in the known set. `args` is preformatted as
    /// backtick-quoted values with a trailing comma, or empty.
    #[error("(error) ERR unknown command `{name}`, with args beginning with: {args}")]
    Unknown { name: String, args: String },

    /// A stored value or operand failed the base-10 integer parse, or the
    /// arithmetic result would overflow.
    #[error("(error) ERR value is not an integer or out of range")]
    NotAnInteger,

    /// SELECT index outside the configured database range.
    #[error("(error) ERR DB index is out of range")]
    DbIndexOutOfRange,
}

/// One parsed client request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    op: Operation,
    key: Option<String>,
    value: Option<String>,
}

impl Command {
    /// Creates a command directly from an operation and its arguments.
    pub fn new(
        op: Operation,
        key: impl Into<Option<String>>,
        value: impl Into<Option<String>>,
    ) -> Self {
        Self {
            op,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Builds a command from tokenized line parts: the first token is the
    /// operation tag, the next two are key and value. Extra tokens are
    /// ignored, matching the two-argument command shape.
    pub fn from_parts(mut parts: Vec<String>) -> Self {
        let value = if parts.len() > 2 {
            Some(parts.swap_remove(2))
        } else {
            None
        };
        let key = if parts.len() > 1 {
            Some(parts.swap_remove(1))
        } else {
            None
        };
        let tag = parts.into_iter().next().unwrap_or_default();

        Self {
            op: Operation::parse(&tag),
            key,
            value,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    /// The key argument, if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// The value argument, preserved verbatim.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// True only for EXEC and DISCARD, the two operations allowed to pass
    /// through an open transaction without being queued.
    pub fn is_terminator(&self) -> bool {
        matches!(self.op, Operation::Exec | Operation::Discard)
    }

    /// Checks the per-operation arity rule.
    ///
    /// A failing command is rejected before dispatch and is never enqueued
    /// inside a transaction.
    pub fn validate(&self) -> Result<(), CommandError> {
        match self.op {
            Operation::Set | Operation::IncrBy => {
                if self.value.is_none() {
                    return Err(CommandError::WrongArity(self.op.arity_name()));
                }
                Ok(())
            }
            Operation::Get | Operation::Del | Operation::Incr | Operation::Select => {
                if self.key().is_none() {
                    return Err(CommandError::WrongArity(self.op.arity_name()));
                }
                Ok(())
            }
            Operation::Multi | Operation::Exec | Operation::Discard | Operation::Compact => Ok(()),
            Operation::Unknown(_) => Err(self.unknown_error()),
        }
    }

    /// The unknown-command error for this command, echoing the tag and the
    /// raw argument list.
    pub fn unknown_error(&self) -> CommandError {
        let name = match &self.op {
            Operation::Unknown(tag) => tag.clone(),
            other => other.arity_name().to_uppercase(),
        };

        let mut args = String::new();
        if let Some(key) = self.key() {
            args = match self.value.as_deref() {
                Some(value) => format!("`{}`, `{}`,", key, value),
                None => format!("`{}`,", key),
            };
        }

        CommandError::Unknown { name, args }
    }
}
