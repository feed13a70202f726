#![deny(missing_docs)]
//! A read-only key/value server speaking the RESP wire protocol.
//!
//! Values live in an immutable, line-delimited records file on disk.
//! Only a byte-offset index is held in memory; every fetch is one seek
//! plus one exact-length read on a pooled file handle.

mod config;
mod error;
mod handler;
mod info;
mod reload;
mod resp;
mod server;
pub mod store;
pub mod workers;

pub use config::{read_config, StoreConfig};
pub use error::{Result, RokvError};
pub use handler::{Handler, Response};
pub use reload::spawn_config_watch;
pub use resp::{Command, Reply};
pub use server::RespServer;
