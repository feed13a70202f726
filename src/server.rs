//! The RESP server: accept loop plus a serial per-connection command
//! loop running on a worker pool.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use log::{debug, error};

use crate::handler::Handler;
use crate::resp;
use crate::workers::SessionPool;
use crate::Result;

/// A RESP server dispatching commands through a [Handler].
pub struct RespServer<P: SessionPool> {
    handler: Arc<Handler>,
    workers: P,
}

impl<P: SessionPool> RespServer<P> {
    /// Create a server with a dispatch handler and a session pool.
    pub fn new(handler: Arc<Handler>, workers: P) -> Self {
        RespServer { handler, workers }
    }

    /// Bind `addr` and serve until the listener fails.
    pub fn run<A: ToSocketAddrs>(&self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener)
    }

    /// Serve connections accepted from an already-bound listener.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let handler = Arc::clone(&self.handler);
                    self.workers.execute(move || {
                        if let Err(e) = serve_connection(handler, stream) {
                            error!("error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("connection failed: {}", e),
            }
        }
        Ok(())
    }
}

/// Commands on one connection are processed serially in arrival order.
fn serve_connection(handler: Arc<Handler>, stream: TcpStream) -> Result<()> {
    let peer_addr = stream.peer_addr()?;
    let mut reader = BufReader::new(&stream);
    let mut writer = BufWriter::new(&stream);
    debug!("accepted connection from {}", peer_addr);

    while let Some(cmd) = resp::read_command(&mut reader)? {
        if cmd.args.is_empty() {
            continue;
        }
        let response = handler.handle(&cmd);
        response.reply.write_to(&mut writer)?;
        writer.flush()?;
        if response.close {
            break;
        }
    }

    debug!("connection from {} closed", peer_addr);
    Ok(())
}
