//! # Protocol Parser
//!
//! Line-oriented text protocol spoken by the cow_kv server. One command per
//! line; command names are case-insensitive.
//!
//! ## Commands
//! - `GET <key>` - Retrieve a value by key
//! - `SET <key> <value>` - Store a key-value pair (the value may contain spaces)
//! - `DEL <key>` or `DELETE <key>` - Delete a key
//! - `PING` - Health check
//! - `STATS` - Server counters
//!
//! ## Responses
//! - Success: `VALUE <data>`, `OK`, `PONG`
//! - Failure: `NOT_FOUND`, `ERROR <message>`
//!
//! Every response line is terminated with `\r\n`.

use anyhow::{anyhow, Result};

use crate::error::StoreError;

/// A parsed client request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get { key: String },
    Set { key: String, value: String },
    Delete { key: String },
    Ping,
    Stats,
}

/// Protocol parser that converts text lines into [`Command`]s.
///
/// Stateless; one instance can be shared by every connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct Protocol;

impl Protocol {
    pub fn new() -> Self {
        Self
    }

    /// Parse one request line.
    ///
    /// # Errors
    /// Returns an error if the line is empty, the command is unknown, or an
    /// argument is missing. Parsing never touches a store, so a bad line
    /// cannot change any state.
    pub fn parse(&self, input: &str) -> Result<Command> {
        let input = input.trim();
        let (name, args) = match input.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim_start()),
            None => (input, ""),
        };

        if name.is_empty() {
            return Err(anyhow!("Empty command"));
        }

        match name.to_uppercase().as_str() {
            "GET" => Ok(Command::Get {
                key: single_key("GET", args)?,
            }),
            "SET" => {
                let (key, value) = match args.split_once(char::is_whitespace) {
                    Some((key, value)) => (key, value.trim()),
                    None => (args, ""),
                };
                if key.is_empty() || value.is_empty() {
                    return Err(anyhow!("SET command requires a key and value"));
                }
                Ok(Command::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            // Support both "DEL" and "DELETE" for convenience
            "DEL" | "DELETE" => Ok(Command::Delete {
                key: single_key("DELETE", args)?,
            }),
            "PING" => Ok(Command::Ping),
            "STATS" => Ok(Command::Stats),
            _ => Err(anyhow!("Unknown command: {}", name)),
        }
    }
}

fn single_key(command: &str, args: &str) -> Result<String> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(key.to_string()),
        (None, _) => Err(anyhow!("{} command requires a key", command)),
        (Some(_), Some(_)) => Err(anyhow!("{} command takes exactly one key", command)),
    }
}

/// Render a store error as a protocol response line.
pub fn store_error_response(err: &StoreError) -> String {
    match err {
        StoreError::KeyNotFound { .. } => "NOT_FOUND\r\n".to_string(),
        other => format!("ERROR {}\r\n", other),
    }
}
