//! Connection Handling Module
//!
//! Each client connection is served by its own async task: write the
//! prompt, read a line, tokenize it, execute the command under the shared
//! engine lock, write the reply. The active database index is per
//! connection; the engine and store are shared by all of them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                      (main.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn per client
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌───────────┐   ┌──────────────┐   ┌────────────────────┐  │
//! │  │ Read line │──>│ Tokenize     │──>│ Engine (Mutex)     │  │
//! │  └───────────┘   └──────────────┘   └─────────┬──────────┘  │
//! │                                               ▼             │
//! │                                      ┌────────────────┐     │
//! │                                      │ Write reply    │     │
//! │                                      └────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
