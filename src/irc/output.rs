//! Paced output queue.
//!
//! Consecutive buffered lines leave at least one send interval apart so the
//! bot never floods the server. A single actor task owns the socket's write
//! half, the pending list and the pacing deadline; the deadline is just another
//! arm of its `select!`, so timer pops and new sends never race.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

enum Outgoing {
    Buffered(String),
    Immediate(String),
    Attach(BoxedWriter, oneshot::Sender<()>),
    Close(Option<oneshot::Sender<std::io::Result<()>>>),
}

/// Sticky error flag plus a wakeup for whoever is blocked on the socket.
#[derive(Default)]
struct ErrorState {
    failed: AtomicBool,
    notify: Notify,
}

/// Cloneable sending side of the queue.
#[derive(Clone)]
pub struct OutputQueue {
    tx: mpsc::UnboundedSender<Outgoing>,
    error: Arc<ErrorState>,
}

/// The actor half. Spawn [`OutputWorker::run`] once per queue.
pub struct OutputWorker {
    rx: mpsc::UnboundedReceiver<Outgoing>,
    error: Arc<ErrorState>,
    writer: Option<BoxedWriter>,
    pending: VecDeque<String>,
    interval: Duration,
    /// Armed while waiting: the earliest instant the next buffered line may go.
    next_pop: Option<Instant>,
}

impl OutputQueue {
    pub fn new(interval: Duration) -> (Self, OutputWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let error = Arc::new(ErrorState::default());
        let queue = Self {
            tx,
            error: Arc::clone(&error),
        };
        let worker = OutputWorker {
            rx,
            error,
            writer: None,
            pending: VecDeque::new(),
            interval,
            next_pop: None,
        };
        (queue, worker)
    }

    /// Send now if idle, otherwise after everything already queued.
    pub fn send_buffered(&self, line: impl Into<String>) {
        self.submit(Outgoing::Buffered(line.into()));
    }

    /// Send ahead of the pending queue, ignoring the pacing interval.
    pub fn send_immediately(&self, line: impl Into<String>) {
        self.submit(Outgoing::Immediate(line.into()));
    }

    pub fn is_in_error(&self) -> bool {
        self.error.failed.load(Ordering::Acquire)
    }

    /// Resolves once a write has failed. Completes at once if a failure was
    /// signalled while nobody was waiting.
    pub async fn failed(&self) {
        self.error.notify.notified().await
    }

    /// Install the write half of a fresh connection. Stale pending lines and
    /// the error flag are cleared before this returns.
    pub async fn attach(&self, writer: BoxedWriter) {
        let (done, wait) = oneshot::channel();
        self.submit(Outgoing::Attach(writer, done));
        let _ = wait.await;
    }

    /// Shut down the sending direction and detach, waiting for the result.
    pub async fn close(&self) -> std::io::Result<()> {
        let (done, wait) = oneshot::channel();
        self.submit(Outgoing::Close(Some(done)));
        wait.await.unwrap_or(Ok(()))
    }

    /// Fire-and-forget [`close`](Self::close), for use from sync code.
    pub fn shutdown(&self) {
        self.submit(Outgoing::Close(None));
    }

    fn submit(&self, msg: Outgoing) {
        if self.tx.send(msg).is_err() {
            debug!("Output worker gone, dropping message");
        }
    }
}

impl OutputWorker {
    /// Run until every [`OutputQueue`] handle is dropped.
    pub async fn run(mut self) {
        loop {
            let armed = self.next_pop.is_some();
            let deadline = self.next_pop.unwrap_or_else(Instant::now);
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.handle(msg).await,
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline), if armed => self.pop().await,
            }
        }
        debug!("Output worker stopped");
    }

    async fn handle(&mut self, msg: Outgoing) {
        match msg {
            Outgoing::Buffered(line) => {
                if self.next_pop.is_some() {
                    self.pending.push_back(line);
                } else {
                    self.write(&line).await;
                    self.arm();
                }
            }
            Outgoing::Immediate(line) => self.write(&line).await,
            Outgoing::Attach(writer, done) => {
                self.writer = Some(writer);
                self.pending.clear();
                self.next_pop = None;
                self.error.failed.store(false, Ordering::Release);
                let _ = done.send(());
            }
            Outgoing::Close(done) => {
                self.pending.clear();
                self.next_pop = None;
                let result = match self.writer.take() {
                    Some(mut writer) => writer.shutdown().await,
                    None => Ok(()),
                };
                if let Err(e) = &result {
                    debug!("Error closing socket: {e}");
                }
                if let Some(done) = done {
                    let _ = done.send(result);
                }
            }
        }
    }

    /// Pacing deadline reached: release the oldest pending line or go idle.
    async fn pop(&mut self) {
        match self.pending.pop_front() {
            Some(line) => {
                self.write(&line).await;
                self.arm();
            }
            None => self.next_pop = None,
        }
    }

    fn arm(&mut self) {
        self.next_pop = Some(Instant::now() + self.interval);
    }

    async fn write(&mut self, line: &str) {
        if self.error.failed.load(Ordering::Acquire) {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            debug!(%line, "Not connected, dropping line");
            return;
        };
        trace!(%line, ">>");
        let mut wire = String::with_capacity(line.len() + 2);
        wire.push_str(line);
        wire.push_str("\r\n");
        let result = match writer.write_all(wire.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(payload = %line, "Output error: {e}");
            self.error.failed.store(true, Ordering::Release);
            self.error.notify.notify_one();
        }
    }
}
