//! RESP v2 framing: parse one command from a connection, serialize one
//! typed reply back.

use std::io::{BufRead, Write};

use crate::{Result, RokvError};

/// One parsed command: the verb plus its arguments, as byte strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `args[0]` is the command name.
    pub args: Vec<Vec<u8>>,
}

impl Command {
    /// All arguments decoded as UTF-8 strings.
    pub fn strings(&self) -> Result<Vec<String>> {
        self.args
            .iter()
            .map(|a| String::from_utf8(a.clone()).map_err(RokvError::from))
            .collect()
    }
}

/// A typed RESP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`-style simple string.
    Simple(String),
    /// `-ERR …` error string.
    Error(String),
    /// `:n` integer.
    Integer(i64),
    /// `$len` bulk string.
    Bulk(String),
    /// `*n` array of replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// Serialize this reply onto `out`. The caller flushes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        match self {
            Reply::Simple(s) => write!(out, "+{}\r\n", s)?,
            Reply::Error(s) => write!(out, "-{}\r\n", s)?,
            Reply::Integer(n) => write!(out, ":{}\r\n", n)?,
            Reply::Bulk(s) => {
                write!(out, "${}\r\n", s.len())?;
                out.write_all(s.as_bytes())?;
                out.write_all(b"\r\n")?;
            }
            Reply::Array(items) => {
                write!(out, "*{}\r\n", items.len())?;
                for item in items {
                    item.write_to(out)?;
                }
            }
        }
        Ok(())
    }
}

/// Read one command off the connection.
///
/// Accepts the multibulk form (`*n` of `$len` bulk strings) that every
/// real client sends, plus whitespace-separated inline commands. Returns
/// `None` on a clean EOF.
pub fn read_command<R: BufRead>(input: &mut R) -> Result<Option<Command>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix('*') {
        let argc: usize = rest
            .parse()
            .map_err(|_| RokvError::StringError(format!("invalid multibulk length '{}'", rest)))?;
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(read_bulk(input)?);
        }
        return Ok(Some(Command { args }));
    }

    let args = line
        .split_whitespace()
        .map(|part| part.as_bytes().to_vec())
        .collect();
    Ok(Some(Command { args }))
}

fn read_bulk<R: BufRead>(input: &mut R) -> Result<Vec<u8>> {
    let mut header = String::new();
    if input.read_line(&mut header)? == 0 {
        return Err(RokvError::StringError(
            "unexpected end of stream in multibulk command".to_owned(),
        ));
    }
    let header = header.trim_end_matches(['\r', '\n']);
    let len: usize = header
        .strip_prefix('$')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RokvError::StringError(format!("invalid bulk length '{}'", header)))?;

    // payload plus trailing CRLF
    let mut buf = vec![0u8; len + 2];
    input.read_exact(&mut buf)?;
    buf.truncate(len);
    Ok(buf)
}
