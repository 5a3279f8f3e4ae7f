use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing::info;

use super::commands;
use super::connection::ConnectionState;
use super::identify::{IdentifyCoordinator, IdentifyStep};
use super::output::OutputQueue;
use super::parser::Message;

/// Connection state plus the wakeup used to interrupt the worker.
pub(crate) struct Shared {
    state: watch::Sender<ConnectionState>,
    pub(crate) wake: Notify,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: watch::Sender::new(ConnectionState::Disconnected),
            wake: Notify::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Move to `next` unless already stopped. Returns whether the state changed.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Stopped || *state == next {
                return false;
            }
            *state = next;
            true
        })
    }
}

/// Cloneable handle to a running [`Client`](crate::Client).
///
/// Handed to every handler and safe to keep across reconnects: sends always
/// go to the current connection. Buffered sends are paced by the output queue.
#[derive(Clone)]
pub struct IrcHandle {
    pub(crate) output: OutputQueue,
    identify: Arc<Mutex<IdentifyCoordinator>>,
    pub(crate) shared: Arc<Shared>,
}

impl IrcHandle {
    pub(crate) fn new(output: OutputQueue) -> Self {
        Self {
            output,
            identify: Arc::new(Mutex::new(IdentifyCoordinator::new())),
            shared: Arc::new(Shared::new()),
        }
    }

    /// Queue a raw line behind anything already waiting.
    pub fn send(&self, line: impl Into<String>) {
        self.output.send_buffered(line);
    }

    /// Write a raw line now, skipping the pacing queue.
    pub fn send_immediately(&self, line: impl Into<String>) {
        self.output.send_immediately(line);
    }

    pub fn say(&self, recipient: &str, message: &str) {
        self.send(commands::privmsg(recipient, message));
    }

    pub fn action(&self, recipient: &str, message: &str) {
        self.send(commands::action(recipient, message));
    }

    pub fn join(&self, channel: &str) {
        info!(channel, "Joining");
        self.send(commands::join(channel));
    }

    pub fn kick(&self, nick: &str, channel: &str, reason: &str) {
        info!(nick, channel, "Kicking");
        self.send(commands::kick(channel, nick, reason));
    }

    /// Set a `+b` on `ban_mask`, then kick `nick`.
    pub fn ban(&self, ban_mask: &str, nick: &str, channel: &str, reason: &str) {
        info!(ban_mask, channel, "Banning");
        self.send(commands::ban(channel, ban_mask));
        self.kick(nick, channel, reason);
    }

    pub fn unban(&self, ban_mask: &str, channel: &str) {
        info!(ban_mask, channel, "Unbanning");
        self.send(commands::unban(channel, ban_mask));
    }

    /// Ask services whether `nick` is identified.
    ///
    /// Exactly one of `on_accept` / `on_reject` runs later, on the worker
    /// task, once the server has answered the WHOIS for `nick`. Requests are
    /// answered in order, one WHOIS at a time.
    pub fn identify<A, R>(&self, nick: &str, on_accept: A, on_reject: R)
    where
        A: FnOnce() + Send + 'static,
        R: FnOnce() + Send + 'static,
    {
        let step = self
            .identify
            .lock()
            .request(nick, Box::new(on_accept), Box::new(on_reject));
        self.apply(step);
    }

    /// Stop the client for good.
    ///
    /// If connected, the socket's sending side is shut down so a blocked read
    /// returns; the worker exits after the line it is handling.
    pub fn stop(&self) {
        let previous = self.shared.state.send_replace(ConnectionState::Stopped);
        if previous == ConnectionState::Connected {
            self.output.shutdown();
        }
        if previous != ConnectionState::Stopped {
            info!("Stop requested");
        }
        self.shared.wake.notify_one();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ConnectionState::Stopped
    }

    /// Resolves once the client has stopped, whether by [`stop`](Self::stop)
    /// or because every reconnect attempt failed.
    pub async fn wait_stopped(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Stopped).await;
    }

    pub(crate) fn on_whois_reply(&self, msg: &Message) {
        let step = self.identify.lock().on_reply(msg);
        self.apply(step);
    }

    pub(crate) fn resume_identify(&self) {
        let step = self.identify.lock().resume();
        self.apply(step);
    }

    /// Run callbacks with the lock released, then send any WHOIS.
    fn apply(&self, step: IdentifyStep) {
        for callback in step.callbacks {
            callback();
        }
        if let Some(nick) = step.whois {
            self.send(commands::whois(&nick));
        }
    }
}
