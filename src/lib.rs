//! # LineKV - A Minimal In-Memory Key-Value Store
//!
//! LineKV is an in-memory key-value database exposed over a line-oriented
//! text protocol. It supports single-key operations, atomic counters,
//! multiple isolated databases, a COMPACT dump, and batched transactional
//! execution with MULTI/EXEC/DISCARD.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           LineKV                              │
//! │                                                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │ TCP Server  │───>│ Connection  │───>│ Engine (Mutex)   │   │
//! │  │ (Listener)  │    │  Handler    │    │  dispatch +      │   │
//! │  └─────────────┘    └─────────────┘    │  transaction     │   │
//! │                                        │  queue           │   │
//! │  ┌─────────────┐                       └────────┬─────────┘   │
//! │  │ Line        │                                ▼             │
//! │  │ Parser      │                       ┌──────────────────┐   │
//! │  │             │                       │      Store       │   │
//! │  └─────────────┘                       │ db 0 │ db 1 │ …  │   │
//! │                                        └──────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! One command per line; tokens are whitespace-separated, with double
//! quotes grouping a value that contains spaces:
//!
//! ```text
//! $SET greeting "hello world"
//! OK
//! $GET greeting
//! hello world
//! $SELECT 3
//! OK
//! [3]$GET greeting
//! (nil)
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value` / `GET key` / `DEL key`
//! - `INCR key` / `INCRBY key amount`
//! - `SELECT index` - switch between the pre-allocated databases
//! - `MULTI` / `EXEC` / `DISCARD` - queue commands and run them as a batch
//! - `COMPACT` - dump the active database as replayable SET lines
//!
//! ## Transactions
//!
//! After MULTI, commands are queued (acknowledged with `QUEUED`) instead of
//! executed. EXEC runs the queue in order and reports one result per
//! command; a failing command keeps its position in the output without
//! aborting the rest. DISCARD drops the queue. There is no rollback.
//!
//! ## Quick Start
//!
//! ```ignore
//! use linekv::connection::{handle_connection, ConnectionStats};
//! use linekv::engine::Engine;
//! use linekv::storage::Store;
//! use std::sync::{Arc, Mutex};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Arc::new(Mutex::new(Engine::new(Store::new(16))));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:9736").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let engine = Arc::clone(&engine);
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, engine, stats));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: line parser, tokenizer, and the [`Reply`] value
//! - [`command`]: parsed commands, validation, and the error taxonomy
//! - [`storage`]: the multi-database in-memory store
//! - [`engine`]: command dispatch and the transaction state machine
//! - [`connection`]: client connection management
//!
//! ## Concurrency
//!
//! All connections share one engine+store pair behind a mutex; the whole
//! execute path is serialized, which the transaction queue requires anyway.
//! Each connection keeps its own active database index.

pub mod command;
pub mod connection;
pub mod engine;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use command::{Command, CommandError, Operation};
pub use connection::{handle_connection, ConnectionStats};
pub use engine::Engine;
pub use protocol::{tokenize, LineParser, ParseError, Reply};
pub use storage::{Store, DEFAULT_DB_COUNT};

/// The default port LineKV listens on
pub const DEFAULT_PORT: u16 = 9736;

/// The default host LineKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of LineKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
