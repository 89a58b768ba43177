//! Command-script parsing and execution.
//!
//! A script holds one command per line:
//!
//! ```text
//! add_server 6352
//! store "ana" "banana"
//! retrieve ana
//! remove_server 6352
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Keys and values may be
//! wrapped in double quotes to carry spaces.

use std::io::{BufRead, Write};

use anyhow::Context;
use ringlb_placement::Ring;
use ringlb_types::ServerId;
use tracing::debug;

/// Errors produced while parsing a script line.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The first word is not a known command.
    #[error("line {line}: unknown command `{name}`")]
    UnknownCommand {
        /// 1-based line number.
        line: usize,
        /// The unrecognized word.
        name: String,
    },

    /// The command needs more arguments.
    #[error("line {line}: `{command}` expects {expected} argument(s)")]
    WrongArity {
        /// 1-based line number.
        line: usize,
        /// Command name.
        command: &'static str,
        /// Number of arguments the command takes.
        expected: usize,
    },

    /// A server id is not a non-negative integer.
    #[error("line {line}: invalid server id `{raw}`")]
    InvalidServerId {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        raw: String,
    },

    /// A quoted token never closes.
    #[error("line {line}: unterminated quote")]
    UnterminatedQuote {
        /// 1-based line number.
        line: usize,
    },
}

/// One parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add_server <id>`
    AddServer(ServerId),
    /// `remove_server <id>`
    RemoveServer(ServerId),
    /// `store <key> <value>`
    Store {
        /// Key to store under.
        key: String,
        /// Value to store.
        value: String,
    },
    /// `retrieve <key>`
    Retrieve {
        /// Key to look up.
        key: String,
    },
}

impl Command {
    /// Parse one script line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse(line: usize, text: &str) -> Result<Option<Self>, CommandError> {
        let tokens = tokenize(line, text)?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        if name.starts_with('#') {
            return Ok(None);
        }

        let command = match name.as_str() {
            "add_server" => Command::AddServer(server_arg(line, "add_server", args)?),
            "remove_server" => Command::RemoveServer(server_arg(line, "remove_server", args)?),
            "store" => match args {
                [key, value] => Command::Store {
                    key: key.clone(),
                    value: value.clone(),
                },
                _ => {
                    return Err(CommandError::WrongArity {
                        line,
                        command: "store",
                        expected: 2,
                    });
                }
            },
            "retrieve" => match args {
                [key] => Command::Retrieve { key: key.clone() },
                _ => {
                    return Err(CommandError::WrongArity {
                        line,
                        command: "retrieve",
                        expected: 1,
                    });
                }
            },
            other => {
                return Err(CommandError::UnknownCommand {
                    line,
                    name: other.to_string(),
                });
            }
        };
        Ok(Some(command))
    }

    /// Apply the command to the ring, writing any report line to `out`.
    pub fn execute(&self, ring: &mut Ring, out: &mut impl Write) -> anyhow::Result<()> {
        match self {
            Command::AddServer(id) => {
                let rebalance = ring.add_server(*id)?;
                debug!(server = %id, moved = rebalance.moved, "add_server");
            }
            Command::RemoveServer(id) => {
                let rebalance = ring.remove_server(*id)?;
                debug!(server = %id, moved = rebalance.moved, "remove_server");
            }
            Command::Store { key, value } => {
                let server = ring.store(key.as_bytes(), value.as_bytes())?;
                writeln!(out, "Stored {value} on server {server}.")?;
            }
            Command::Retrieve { key } => match ring.retrieve(key.as_bytes())? {
                (Some(value), server) => {
                    writeln!(
                        out,
                        "Retrieved {} from server {server}.",
                        String::from_utf8_lossy(value)
                    )?;
                }
                (None, _) => writeln!(out, "Key {key} not present.")?,
            },
        }
        Ok(())
    }
}

/// Run every command of a script against `ring`.
///
/// Stops at the first parse or placement error, naming the failing line.
pub fn run_script(
    input: impl BufRead,
    ring: &mut Ring,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let mut executed = 0;
    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let text = line.with_context(|| format!("failed to read line {line_no}"))?;
        let Some(command) = Command::parse(line_no, &text)? else {
            continue;
        };
        command
            .execute(ring, out)
            .with_context(|| format!("line {line_no}: `{}` failed", text.trim()))?;
        executed += 1;
    }
    Ok(executed)
}

fn server_arg(
    line: usize,
    command: &'static str,
    args: &[String],
) -> Result<ServerId, CommandError> {
    let [raw] = args else {
        return Err(CommandError::WrongArity {
            line,
            command,
            expected: 1,
        });
    };
    raw.parse::<u32>()
        .map(ServerId::from)
        .map_err(|_| CommandError::InvalidServerId {
            line,
            raw: raw.clone(),
        })
}

/// Split a line on whitespace, keeping double-quoted runs together.
fn tokenize(line: usize, text: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => token.push(ch),
                    None => return Err(CommandError::UnterminatedQuote { line }),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}
