//! Worker crews that run client sessions off the accept loop.
//!
//! Each accepted connection becomes one session: a closure that owns
//! its stream and serves commands until the peer goes away. A crew has
//! to outlive handler bugs, so a panic inside one session ends that
//! connection only, never a worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use log::error;

use crate::{Result, RokvError};

type Session = Box<dyn FnOnce() + Send + 'static>;

/// Executors the accept loop hands connection sessions to.
pub trait SessionPool {
    /// Create a pool with `workers` threads ready to serve sessions.
    fn with_workers(workers: usize) -> Result<Self>
    where
        Self: Sized;

    /// Hand one connection session to the pool.
    fn execute<F>(&self, session: F)
    where
        F: FnOnce() + Send + 'static;
}

/// A fixed crew of named threads fed from one shared queue.
///
/// Dropping the crew closes the queue and joins every worker, so a
/// server shutting down still finishes the sessions it accepted.
pub struct Workers {
    crew: Vec<thread::JoinHandle<()>>,
    queue: Option<Sender<Session>>,
}

impl SessionPool for Workers {
    fn with_workers(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(RokvError::StringError(
                "a worker crew needs at least one thread".to_owned(),
            ));
        }

        let (queue, incoming) = channel::<Session>();
        let incoming = Arc::new(Mutex::new(incoming));

        let crew = (0..workers)
            .map(|n| {
                let incoming = Arc::clone(&incoming);
                thread::Builder::new()
                    .name(format!("resp-worker-{}", n))
                    .spawn(move || serve_sessions(&incoming))
                    .map_err(RokvError::from)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Workers {
            crew,
            queue: Some(queue),
        })
    }

    fn execute<F>(&self, session: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue
            .as_ref()
            .expect("queue closed before the crew")
            .send(Box::new(session))
            .expect("no worker left to take the session");
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        drop(self.queue.take());
        for worker in self.crew.drain(..) {
            if worker.join().is_err() {
                error!("a connection worker exited abnormally");
            }
        }
    }
}

/// Pull sessions until the accept loop closes the queue. A panicking
/// session (a command-handler bug) is logged and dropped together with
/// its connection; the worker moves on to the next one.
fn serve_sessions(incoming: &Mutex<Receiver<Session>>) {
    loop {
        let session = match incoming.lock().unwrap().recv() {
            Ok(session) => session,
            Err(_) => return,
        };
        if panic::catch_unwind(AssertUnwindSafe(session)).is_err() {
            error!("session panicked, dropping its connection");
        }
    }
}

/// Session pool on top of rayon's work-stealing threads. No join on
/// drop; the long-lived server binary uses this one.
pub struct RayonSessionPool(rayon::ThreadPool);

impl SessionPool for RayonSessionPool {
    fn with_workers(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|n| format!("resp-rayon-{}", n))
            .build()
            .map_err(|e| RokvError::StringError(e.to_string()))?;

        Ok(RayonSessionPool(pool))
    }

    fn execute<F>(&self, session: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.spawn(session)
    }
}
