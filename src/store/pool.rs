//! A non-lazy, bounded pool of seekable readers.
//!
//! All handles are opened up front and parked in a bounded channel.
//! Acquisition blocks with a timeout; the returned guard hands the
//! reader back on drop, on every exit path including unwind.

use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Mutex;
use std::time::Duration;

use crate::{Result, RokvError};

/// A seekable byte source the pool can lend out.
pub trait RecordReader: Read + Seek + Send {}

impl<R: Read + Seek + Send> RecordReader for R {}

/// Pool sizing and timeout knobs.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of readers opened eagerly; the concurrency bound.
    pub max_connections: usize,
    /// Default acquisition wait.
    pub default_timeout: Duration,
    /// Per-handle wait during drain.
    pub drain_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            max_connections: 100,
            default_timeout: Duration::from_millis(100),
            drain_timeout: Duration::from_secs(1),
        }
    }
}

/// Bounded pool of [RecordReader] handles.
pub struct ReaderPool {
    tx: SyncSender<Box<dyn RecordReader>>,
    rx: Mutex<Receiver<Box<dyn RecordReader>>>,
    capacity: usize,
    default_timeout: Duration,
    drain_timeout: Duration,
    drained: AtomicBool,
}

impl ReaderPool {
    /// Open `max_connections` readers through `open` and park them.
    ///
    /// Fails on the first factory error; readers opened so far are
    /// dropped (and thereby closed) with the partially filled channel.
    pub fn new<F>(open: F, options: &PoolOptions) -> Result<ReaderPool>
    where
        F: Fn() -> Result<Box<dyn RecordReader>>,
    {
        let (tx, rx) = mpsc::sync_channel(options.max_connections);
        for _ in 0..options.max_connections {
            let reader = open()
                .map_err(|e| RokvError::StringError(format!("error opening reader: {}", e)))?;
            tx.send(reader).expect("pool channel closed during construction");
        }

        Ok(ReaderPool {
            tx,
            rx: Mutex::new(rx),
            capacity: options.max_connections,
            default_timeout: options.default_timeout,
            drain_timeout: options.drain_timeout,
            drained: AtomicBool::new(false),
        })
    }

    /// Borrow a reader, waiting up to the default timeout.
    pub fn acquire(&self) -> Result<PooledReader<'_>> {
        self.acquire_with_timeout(self.default_timeout)
    }

    /// Borrow a reader, waiting up to `timeout`.
    ///
    /// The drained check is advisory: it may race with a concurrent
    /// [`ReaderPool::drain`], in which case this call times out instead.
    pub fn acquire_with_timeout(&self, timeout: Duration) -> Result<PooledReader<'_>> {
        if self.drained.load(Ordering::Relaxed) {
            return Err(RokvError::PoolDrained);
        }

        let rx = self.rx.lock().unwrap();
        match rx.recv_timeout(timeout) {
            Ok(reader) => Ok(PooledReader {
                pool: self,
                reader: Some(reader),
            }),
            Err(RecvTimeoutError::Timeout) => Err(RokvError::PoolTimeout),
            Err(RecvTimeoutError::Disconnected) => Err(RokvError::PoolDrained),
        }
    }

    /// Mark the pool drained and close every handle, waiting up to the
    /// drain timeout for each one still lent out.
    pub fn drain(&self) -> Result<()> {
        self.drained.store(true, Ordering::Relaxed);
        let rx = self.rx.lock().unwrap();
        for _ in 0..self.capacity {
            match rx.recv_timeout(self.drain_timeout) {
                Ok(reader) => drop(reader),
                Err(RecvTimeoutError::Timeout) => return Err(RokvError::DrainTimeout),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    /// Whether [`ReaderPool::drain`] has been called.
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Relaxed)
    }

    fn release(&self, reader: Box<dyn RecordReader>) {
        // After drain() returned the receiver may be gone; the reader
        // then drops here, which closes it.
        let _ = self.tx.send(reader);
    }
}

/// RAII guard over a borrowed reader; returns it to the pool on drop.
pub struct PooledReader<'a> {
    pool: &'a ReaderPool,
    reader: Option<Box<dyn RecordReader>>,
}

impl PooledReader<'_> {
    fn inner(&mut self) -> &mut Box<dyn RecordReader> {
        self.reader.as_mut().expect("reader already returned")
    }
}

impl Read for PooledReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner().read(buf)
    }
}

impl Seek for PooledReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner().seek(pos)
    }
}

impl Drop for PooledReader<'_> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.pool.release(reader);
        }
    }
}
