//! LineKV - A Minimal In-Memory Key-Value Store
//!
//! This is the main entry point for the LineKV server. It parses the
//! configuration, sets up the storage and engine, and accepts client
//! connections.

use linekv::connection::{handle_connection, ConnectionStats};
use linekv::engine::Engine;
use linekv::storage::Store;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Number of pre-allocated databases
    databases: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: linekv::DEFAULT_HOST.to_string(),
            port: env_or(
                "LINEKV_PORT",
                linekv::DEFAULT_PORT,
            ),
            databases: env_or(
                "LINEKV_DATABASES",
                linekv::DEFAULT_DB_COUNT,
            ),
        }
    }
}

/// Reads an environment variable, falling back to `default` when it is
/// absent or unparsable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Parse configuration from command-line arguments. Flags override the
    /// environment.
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--databases" | "-n" => {
                    if i + 1 < args.len() {
                        config.databases = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid database count");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --databases requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("LineKV version {}", linekv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        // Zero databases would make every SELECT fail; fall back.
        if config.databases == 0 {
            config.databases = linekv::DEFAULT_DB_COUNT;
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
LineKV - A Minimal In-Memory Key-Value Store

USAGE:
    linekv [OPTIONS]

OPTIONS:
    -h, --host <HOST>     Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>     Port to listen on (default: 9736, env: LINEKV_PORT)
    -n, --databases <N>   Number of databases (default: 16, env: LINEKV_DATABASES)
    -v, --version         Print version information
        --help            Print this help message

EXAMPLES:
    linekv                         # Start on 127.0.0.1:9736 with 16 databases
    linekv --port 9737             # Start on port 9737
    linekv --databases 4           # Pre-allocate 4 databases

CONNECTING:
    Any line-based TCP client works:
    $ nc 127.0.0.1 9736
    $SET name "LineKV"
    OK
    $GET name
    LineKV
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging, overridable via RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("LineKV v{} starting", linekv::VERSION);

    // One engine+store pair shared by every connection
    let engine = Arc::new(Mutex::new(Engine::new(Store::new(config.databases))));
    info!("Storage initialized with {} databases", config.databases);

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, engine, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    engine: Arc<Mutex<Engine>>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let engine = Arc::clone(&engine);
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, engine, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
