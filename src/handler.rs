//! Command dispatch: maps parsed RESP commands onto the store and
//! builds one typed reply per command.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::info;
use crate::resp::{Command, Reply};
use crate::store::{scan_fields, Payload, Store};
use crate::{Result, RokvError};

/// The dispatch layer. Holds the current [Store] behind an atomic
/// reference-counted swap so the hot-reload loop can substitute a new
/// generation without interrupting in-flight commands: every command
/// pins one generation up front and runs wholly against it.
pub struct Handler {
    store: ArcSwap<Store>,
}

/// A handled command: the reply plus whether the connection should be
/// closed after the reply is flushed.
pub struct Response {
    /// Reply to serialize.
    pub reply: Reply,
    /// Close the connection after writing (QUIT, DETACH).
    pub close: bool,
}

impl Handler {
    /// Create a handler serving `store`.
    pub fn new(store: Arc<Store>) -> Self {
        Handler {
            store: ArcSwap::from(store),
        }
    }

    /// Atomically substitute the store; in-flight commands keep the
    /// generation they pinned.
    pub fn swap_store(&self, store: Arc<Store>) {
        self.store.store(store);
    }

    /// The current store generation.
    pub fn store(&self) -> Arc<Store> {
        self.store.load_full()
    }

    /// Dispatch one command and produce one reply.
    pub fn handle(&self, cmd: &Command) -> Response {
        let args = match cmd.strings() {
            Ok(args) => args,
            Err(e) => return Response { reply: err_reply(e), close: false },
        };
        let Some(name) = args.first() else {
            return Response {
                reply: Reply::Error("ERR empty command".to_owned()),
                close: false,
            };
        };
        let name = name.to_ascii_lowercase();

        // QUIT and DETACH both flush +OK and leave the connection loop;
        // with a thread per connection there is no loop to stay
        // detached from.
        if name == "quit" || name == "detach" {
            return Response {
                reply: Reply::Simple("OK".to_owned()),
                close: true,
            };
        }

        let store = self.store.load_full();
        let result = match name.as_str() {
            "ping" => Ok(Reply::Simple("PONG".to_owned())),
            "info" => Ok(render_info(&store, &args[1..])),
            "get" => get(&store, &args),
            "type" => record_type(&store, &args),
            "memory" => memory_usage(&store, &args),
            "hlen" => hlen(&store, &args),
            "hscan" => hscan(&store, &args),
            "hgetall" => hgetall(&store, &args),
            "llen" => llen(&store, &args),
            "lrange" => lrange(&store, &args),
            "zcard" => zcard(&store, &args),
            "scan" => scan(&store, &args),
            _ => Ok(Reply::Error(format!("ERR unknown command '{}'", name))),
        };

        Response {
            reply: result.unwrap_or_else(err_reply),
            close: false,
        }
    }
}

fn err_reply(e: RokvError) -> Reply {
    Reply::Error(format!("ERR {}", e))
}

fn arity(args: &[String], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(RokvError::StringError(format!(
            "wrong number of arguments for '{}' command",
            args[0]
        )));
    }
    Ok(())
}

fn render_info(store: &Store, sections: &[String]) -> Reply {
    let sections = info::resolve_sections(sections);
    Reply::Bulk(info::render(&sections, store.len()))
}

fn get(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    let record = store.record(&args[1])?;
    match record.payload {
        Payload::String(value) => Ok(Reply::Bulk(value)),
        _ => Ok(Reply::Error(format!(
            "ERR record for key {} is not a string",
            args[1]
        ))),
    }
}

fn record_type(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    let entry = store.record_index(&args[1])?;
    Ok(Reply::Bulk(entry.kind.as_str().to_owned()))
}

/// `MEMORY USAGE key`: the byte length of the encoded record, straight
/// from the index.
fn memory_usage(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 3)?;
    if !args[1].eq_ignore_ascii_case("usage") {
        // the reference emits this one bare, with no ERR prefix
        return Ok(Reply::Error("no usage keyword".to_owned()));
    }
    let entry = store.record_index(&args[2])?;
    Ok(Reply::Integer(entry.len as i64))
}

fn hlen(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    match store.record(&args[1])?.payload {
        Payload::Hash(fields) => Ok(Reply::Integer(fields.len() as i64)),
        _ => Ok(Reply::Error("ERR wrong type to call hlen for".to_owned())),
    }
}

fn zcard(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    match store.record(&args[1])?.payload {
        Payload::ZSet(elements) => Ok(Reply::Integer(elements.len() as i64)),
        _ => Ok(Reply::Error("ERR wrong type to call zcard for".to_owned())),
    }
}

fn llen(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    match store.record(&args[1])?.payload {
        Payload::List(elements) => Ok(Reply::Integer(elements.len() as i64)),
        _ => Ok(Reply::Error("ERR wrong type to call LLEN for".to_owned())),
    }
}

/// `LRANGE key start stop` over the half-open range `[start, stop)`.
/// Negative indexes count from the end; out-of-range ends are clamped.
fn lrange(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 4)?;
    let start: i64 = args[2]
        .parse()
        .map_err(|e| RokvError::Parse(format!("start: {}", e)))?;
    let stop: i64 = args[3]
        .parse()
        .map_err(|e| RokvError::Parse(format!("stop: {}", e)))?;

    let elements = match store.record(&args[1])?.payload {
        Payload::List(elements) => elements,
        _ => return Ok(Reply::Error("ERR wrong type to call LRANGE for".to_owned())),
    };

    let len = elements.len() as i64;
    let start = (if start < 0 { len + start } else { start }).max(0);
    let stop = (if stop < 0 { len + stop } else { stop }).clamp(0, len);
    if start > stop {
        return Ok(Reply::Array(Vec::new()));
    }

    let items = elements[start as usize..stop as usize]
        .iter()
        .map(|e| Reply::Bulk(e.clone()))
        .collect();
    Ok(Reply::Array(items))
}

fn hgetall(store: &Store, args: &[String]) -> Result<Reply> {
    arity(args, 2)?;
    let fields = match store.record(&args[1])?.payload {
        Payload::Hash(fields) => fields,
        _ => {
            return Ok(Reply::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_owned(),
            ))
        }
    };

    let count = fields.len();
    let (flat, _) = scan_fields(&fields, 0, count, "*")?;
    Ok(Reply::Array(flat.into_iter().map(Reply::Bulk).collect()))
}

fn hscan(store: &Store, args: &[String]) -> Result<Reply> {
    if args.len() < 2 {
        return Err(RokvError::StringError(format!(
            "wrong number of arguments for '{}' command",
            args[0]
        )));
    }
    let cursor: u32 = match args.get(2) {
        Some(raw) => raw
            .parse()
            .map_err(|e| RokvError::Parse(format!("cursor {}", e)))?,
        None => 0,
    };
    let options = parse_scan_options(args.get(3..).unwrap_or(&[]))?;

    let fields = match store.record(&args[1])?.payload {
        Payload::Hash(fields) => fields,
        _ => {
            return Ok(Reply::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_owned(),
            ))
        }
    };

    let count = options.count.unwrap_or(fields.len());
    let (flat, next) = scan_fields(&fields, cursor, count, &options.pattern)?;
    Ok(Reply::Array(vec![
        Reply::Bulk(next.to_string()),
        Reply::Array(flat.into_iter().map(Reply::Bulk).collect()),
    ]))
}

fn scan(store: &Store, args: &[String]) -> Result<Reply> {
    let cursor: usize = match args.get(1) {
        Some(raw) => raw
            .parse()
            .map_err(|e| RokvError::Parse(format!("cursor {}", e)))?,
        None => 0,
    };
    let options = parse_scan_options(args.get(2..).unwrap_or(&[]))?;

    let count = options.count.unwrap_or_else(|| store.len());
    let (entries, next) = store.scan_keys(cursor, count, &options.pattern)?;
    let keys = entries
        .into_iter()
        .map(|entry| Reply::Bulk(entry.key))
        .collect();
    Ok(Reply::Array(vec![
        Reply::Bulk(next.to_string()),
        Reply::Array(keys),
    ]))
}

struct ScanOptions {
    count: Option<usize>,
    pattern: String,
}

/// Parse trailing `MATCH pattern` / `COUNT n` pairs. Keywords are
/// case-insensitive; unrecognized tokens are skipped.
fn parse_scan_options(args: &[String]) -> Result<ScanOptions> {
    let mut options = ScanOptions {
        count: None,
        pattern: "*".to_owned(),
    };

    let mut i = 0;
    while i < args.len() {
        if args[i].eq_ignore_ascii_case("count") {
            let raw = args
                .get(i + 1)
                .ok_or_else(|| RokvError::Parse("COUNT".to_owned()))?;
            let count = raw
                .parse()
                .map_err(|e| RokvError::Parse(format!("COUNT, {}", e)))?;
            options.count = Some(count);
            i += 2;
        } else if args[i].eq_ignore_ascii_case("match") {
            options.pattern = args
                .get(i + 1)
                .ok_or_else(|| RokvError::Parse("MATCH".to_owned()))?
                .clone();
            i += 2;
        } else {
            i += 1;
        }
    }

    Ok(options)
}
