//! Line Protocol Implementation
//!
//! The wire protocol is plain text, one command per line. Tokens are
//! whitespace-separated; double quotes group a token containing spaces.
//! Replies are rendered as single lines, or as numbered lines for sequence
//! results (EXEC and COMPACT).
//!
//! ## Modules
//!
//! - `parser`: incremental line extraction and quote-aware tokenization
//! - `types`: the [`Reply`] value and its client-facing rendering
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{tokenize, Reply};
//!
//! let tokens = tokenize(r#"SET greeting "hello world""#).unwrap();
//! assert_eq!(tokens, vec!["SET", "greeting", "hello world"]);
//!
//! assert_eq!(Reply::ok().render(), "OK\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{tokenize, LineParser, ParseError, ParseResult};
pub use types::Reply;
