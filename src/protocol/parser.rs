//! Incremental Line Parser
//!
//! The wire protocol is one command per newline-terminated line. This parser
//! works incrementally over a byte buffer the way the connection layer fills
//! it: call [`LineParser::parse`] with the current buffer contents and it
//! returns either a tokenized command line plus the number of bytes
//! consumed, `None` when no complete line has arrived yet, or a
//! [`ParseError`] for malformed input.
//!
//! ## Tokenization
//!
//! Tokens are separated by whitespace. A token may be wrapped in double
//! quotes to include spaces; the quotes themselves are stripped:
//!
//! ```text
//! SET greeting "hello world"   ->   [SET, greeting, hello world]
//! ```
//!
//! A line that opens a quote without closing it is a protocol error, and the
//! connection layer reports it to the client and drops the connection.

use thiserror::Error;

/// Errors that can occur while decoding a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted token was opened but never closed before end of line.
    #[error("unbalanced quotes in request")]
    UnbalancedQuotes,

    /// The line is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An incremental parser for newline-delimited command lines.
#[derive(Debug, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to extract and tokenize one complete line from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((tokens, consumed)))` - a full line was available;
    ///   `consumed` bytes (including the newline) should be discarded
    /// - `Ok(None)` - no newline yet, need more data
    /// - `Err(e)` - the line was malformed
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Vec<String>, usize)>> {
        let newline = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let line = std::str::from_utf8(&buf[..newline])
            .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

        let tokens = tokenize(line.trim())?;
        Ok(Some((tokens, newline + 1)))
    }
}

/// Splits a line into tokens on whitespace, honoring double-quoted tokens
/// that may span spaces. Quote characters are stripped from the output.
pub fn tokenize(line: &str) -> ParseResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(ParseError::UnbalancedQuotes);
    }

    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
