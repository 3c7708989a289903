//! Connection Handler Module
//!
//! Each client gets its own async task running a prompt/read/execute/reply
//! loop over the line protocol. The task owns the connection's read buffer
//! and its active database index; the engine itself is shared behind a
//! mutex so the entire execute path is serialized across clients.
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol: a read may deliver a partial line or several
//! lines at once. Incoming bytes accumulate in a `BytesMut` buffer and the
//! line parser consumes one complete line at a time.

use crate::command::Command;
use crate::engine::Engine;
use crate::protocol::{LineParser, ParseError, Reply};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Holds the read buffer, the line parser, and the connection's active
/// database index; commands route through the shared engine.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The shared execution engine
    engine: Arc<Mutex<Engine>>,

    /// Line parser
    parser: LineParser,

    /// Active database index, carried between commands. Updated by a
    /// successful SELECT; private to this connection.
    db_index: usize,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        engine: Arc<Mutex<Engine>>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            engine,
            parser: LineParser::new(),
            db_index: 0,
            stats,
        }
    }

    /// Runs the main connection loop until the client disconnects or an
    /// error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                ConnectionError::ParseError(e) => {
                    debug!(client = %self.addr, error = %e, "Protocol error, closing")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main prompt-read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        self.send_prompt().await?;

        loop {
            // Drain every complete line already buffered
            loop {
                let tokens = match self.try_parse_line() {
                    Ok(Some(tokens)) => tokens,
                    Ok(None) => break,
                    Err(ConnectionError::ParseError(e)) => {
                        // Malformed line: report it, then drop the client.
                        self.send_text(&format!("(error) ERR Protocol error: {}\n", e))
                            .await?;
                        return Err(ConnectionError::ParseError(e));
                    }
                    Err(e) => return Err(e),
                };

                let command = Command::from_parts(tokens);
                let reply = self.execute(command);
                self.stats.command_processed();

                self.send_text(&reply.render()).await?;
                self.send_prompt().await?;
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Executes one command under the shared engine lock, carrying this
    /// connection's database index across the call.
    fn execute(&mut self, command: Command) -> Reply {
        // Sync mutex, never held across an await.
        let mut engine = self.engine.lock().unwrap_or_else(|e| e.into_inner());
        let (next_index, reply) = engine.execute(self.db_index, command);
        self.db_index = next_index;
        reply
    }

    /// Attempts to extract one tokenized line from the buffer.
    fn try_parse_line(&mut self) -> Result<Option<Vec<String>>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((tokens, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed command line"
                );
                Ok(Some(tokens))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete line, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Parse error");
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial line left in the buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes the prompt: `$` on database 0, `[n]$` elsewhere.
    async fn send_prompt(&mut self) -> Result<(), ConnectionError> {
        let prompt = if self.db_index > 0 {
            format!("[{}]$", self.db_index)
        } else {
            "$".to_string()
        };
        self.send_text(&prompt).await
    }

    /// Sends raw text to the client.
    async fn send_text(&mut self, text: &str) -> Result<(), ConnectionError> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(text.len());
        trace!(
            client = %self.addr,
            bytes = text.len(),
            "Sent reply"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line protocol error
    #[error("Protocol error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial line)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection to completion.
///
/// Convenience wrapper that builds a [`ConnectionHandler`] and runs it,
/// swallowing the expected disconnect errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    engine: Arc<Mutex<Engine>>,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, engine, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
