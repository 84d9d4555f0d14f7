//! # TCP Server Implementation
//!
//! Accepts client connections and runs protocol commands against one shared
//! engine.
//!
//! ## Architecture
//!
//! - Main loop accepts incoming connections
//! - Each connection is served by its own task, one command per line
//! - Request lines are capped at `max_line_bytes`; an overlong line gets
//!   `ERROR line too long` and is skipped up to its newline
//! - The engine is shared as `Arc<dyn KvStore>` with no outer lock; engines
//!   do their own synchronisation, so a slow writer on one connection never
//!   stalls readers on another beyond what the engine itself imposes
//!
//! See [`crate::protocol`] for the command set.

use anyhow::Result;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::protocol::{store_error_response, Command, Protocol};
use crate::store::KvStore;

/// Counters reported by the `STATS` command.
#[derive(Debug)]
pub struct ServerStats {
    /// Total number of connections since server start
    pub total_connections: AtomicU64,

    /// Current number of active connections
    pub active_connections: AtomicU64,

    /// Total number of commands processed
    pub total_commands: AtomicU64,

    pub get_commands: AtomicU64,
    pub set_commands: AtomicU64,
    pub delete_commands: AtomicU64,

    /// PING and STATS
    pub stat_commands: AtomicU64,

    /// Responses that were `ERROR ...` (parse failures included)
    pub error_responses: AtomicU64,

    pub start_time: Instant,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
            get_commands: AtomicU64::new(0),
            set_commands: AtomicU64::new(0),
            delete_commands: AtomicU64::new(0),
            stat_commands: AtomicU64::new(0),
            error_responses: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Increment the counter for a specific command type
    pub fn increment_command_counter(&self, command: &Command) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);

        let counter = match command {
            Command::Get { .. } => &self.get_commands,
            Command::Set { .. } => &self.set_commands,
            Command::Delete { .. } => &self.delete_commands,
            Command::Ping | Command::Stats => &self.stat_commands,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Format all statistics as `name:value` lines for the STATS command
    pub fn format_stats(&self, engine: &str) -> String {
        let counters = [
            ("total_connections", &self.total_connections),
            ("active_connections", &self.active_connections),
            ("total_commands", &self.total_commands),
            ("get_commands", &self.get_commands),
            ("set_commands", &self.set_commands),
            ("delete_commands", &self.delete_commands),
            ("stat_commands", &self.stat_commands),
            ("error_responses", &self.error_responses),
        ];

        let mut result = format!("engine:{}\r\n", engine);
        result.push_str(&format!("uptime_seconds:{}\r\n", self.uptime_seconds()));
        for (name, counter) in counters {
            result.push_str(&format!("{}:{}\r\n", name, counter.load(Ordering::Relaxed)));
        }
        result
    }
}

/// TCP server for handling client connections.
pub struct Server {
    config: Config,
    store: Arc<dyn KvStore>,
    stats: Arc<ServerStats>,
}

impl Server {
    pub fn new(config: Config, store: Box<dyn KvStore>) -> Self {
        Self {
            config,
            store: Arc::from(store),
            stats: Arc::new(ServerStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Bind the listener described by the configuration.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!(
            "Server listening on {} (engine: {})",
            listener.local_addr()?,
            self.store.name()
        );
        Ok(listener)
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` forever, one task per connection.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    info!("Accepted connection from {}", addr);
                    let store = Arc::clone(&self.store);
                    let stats = Arc::clone(&self.stats);
                    let max_line = self.config.max_line_bytes;

                    stats.total_connections.fetch_add(1, Ordering::Relaxed);
                    stats.active_connections.fetch_add(1, Ordering::Relaxed);

                    tokio::spawn(async move {
                        let served =
                            handle_connection(socket, addr, store, stats.clone(), max_line).await;
                        if let Err(e) = served {
                            error!("Error handling connection from {}: {}", addr, e);
                        }
                        stats.active_connections.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(e) => {
                    // Keep accepting other connections
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// One request line as read off the socket.
#[derive(Debug, PartialEq)]
enum Line {
    Request(String),
    TooLong,
    NotUtf8,
}

/// Read the next line, holding at most `max_line + 2` bytes of it in memory.
///
/// Returns `None` at end of stream. The line ending (`\n` or `\r\n`) does not
/// count towards `max_line`. An overlong line is consumed up to and including
/// its newline before `Line::TooLong` is returned, so the next call starts on
/// the following request.
async fn next_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line: usize,
) -> std::io::Result<Option<Line>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = max_line as u64 + 2;
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > max_line {
        discard_line(reader).await?;
        return Ok(Some(Line::TooLong));
    }
    if buf.len() > max_line {
        return Ok(Some(Line::TooLong));
    }

    match std::str::from_utf8(buf) {
        Ok(line) => Ok(Some(Line::Request(line.to_string()))),
        Err(_) => Ok(Some(Line::NotUtf8)),
    }
}

/// Skip input up to and including the next newline, or to end of stream.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Serve one client until it disconnects.
async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    store: Arc<dyn KvStore>,
    stats: Arc<ServerStats>,
    max_line: usize,
) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let protocol = Protocol::new();

    while let Some(line) = next_line(&mut reader, &mut buf, max_line).await? {
        let response = match line {
            Line::Request(line) if line.trim().is_empty() => continue,
            Line::Request(line) => match protocol.parse(&line) {
                Ok(command) => {
                    stats.increment_command_counter(&command);
                    execute(store.as_ref(), &stats, command)
                }
                Err(e) => {
                    warn!("Bad request from {}: {}", addr, e);
                    format!("ERROR {}\r\n", e)
                }
            },
            Line::TooLong => {
                warn!("Request from {} exceeds {} bytes", addr, max_line);
                "ERROR line too long\r\n".to_string()
            }
            Line::NotUtf8 => {
                warn!("Request from {} is not valid UTF-8", addr);
                "ERROR request is not valid UTF-8\r\n".to_string()
            }
        };
        if response.starts_with("ERROR") {
            stats.error_responses.fetch_add(1, Ordering::Relaxed);
        }

        writer.write_all(response.as_bytes()).await?;
    }

    info!("Connection closed by {}", addr);
    Ok(())
}

/// Run one command against `store` and render the response.
pub fn execute(store: &dyn KvStore, stats: &ServerStats, command: Command) -> String {
    match command {
        Command::Get { key } => match store.get(&key) {
            Ok(value) => format!("VALUE {}\r\n", value),
            Err(e) => store_error_response(&e),
        },
        Command::Set { key, value } => match store.set(key, value) {
            Ok(()) => "OK\r\n".to_string(),
            Err(e) => store_error_response(&e),
        },
        Command::Delete { key } => match store.delete(&key) {
            Ok(()) => "OK\r\n".to_string(),
            Err(e) => store_error_response(&e),
        },
        Command::Ping => "PONG\r\n".to_string(),
        Command::Stats => format!("STATS\r\n{}END\r\n", stats.format_stats(store.name())),
    }
}
