//! Connection manager: socket ownership, the read/dispatch loop, and the
//! bounded reconnect state machine.
//!
//! ```text
//! Disconnected --connect--> Connected --disconnect / I/O error--> Disconnected
//!       \                                                            |
//!        +------ stop / retries exhausted ------> Stopped <----------+
//! ```
//!
//! `Stopped` is terminal: nothing reconnects a stopped client.

use std::io;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::commands;
use super::dispatch::Dispatcher;
use super::handle::IrcHandle;
use super::input::InputBuffer;
use super::output::{OutputQueue, OutputWorker};
use super::parser::Message;
use crate::config::ClientConfig;
use crate::error::{ConfigError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Stopped,
}

/// An IRC client bound to one server.
///
/// Register handlers with [`bind`](Self::bind), then drive it with
/// [`run`](Self::run) or [`spawn`](Self::spawn). All interaction from other
/// tasks goes through an [`IrcHandle`].
pub struct Client {
    config: ClientConfig,
    handle: IrcHandle,
    dispatcher: Dispatcher<IrcHandle>,
    input: Option<InputBuffer<OwnedReadHalf>>,
    /// Taken and spawned on first connect.
    output_worker: Option<OutputWorker>,
}

impl Client {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let (output, worker) = OutputQueue::new(config.send_interval());
        Ok(Self {
            config,
            handle: IrcHandle::new(output),
            dispatcher: Dispatcher::new(),
            input: None,
            output_worker: Some(worker),
        })
    }

    pub fn handle(&self) -> IrcHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Bind `handler` to `command` (a name like `PRIVMSG` or a numeric like
    /// `376`). A later bind for the same command replaces this one.
    pub fn bind<F>(&mut self, command: &str, handler: F) -> bool
    where
        F: FnMut(&IrcHandle, &Message) + Send + 'static,
    {
        self.dispatcher.bind(command, handler)
    }

    pub fn unbind(&mut self, command: &str) -> bool {
        self.dispatcher.unbind(command)
    }

    /// Open the socket and attach it to the output queue.
    ///
    /// On failure the state stays `Disconnected` and the error is returned.
    /// A [`stop`](IrcHandle::stop) abandons a connect still in progress.
    pub async fn connect(&mut self) -> Result<()> {
        if let Some(worker) = self.output_worker.take() {
            tokio::spawn(worker.run());
        }

        let addr = self.config.address();
        info!(%addr, "Connecting...");
        let timeout = self.config.read_timeout();
        let connecting = tokio::time::timeout(timeout, TcpStream::connect(&addr));
        let result = tokio::select! {
            biased;
            _ = self.handle.wait_stopped() => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "stopped while connecting").into());
            }
            result = connecting => result,
        };
        let stream = match result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.handle.shared.transition(ConnectionState::Disconnected);
                return Err(e.into());
            }
            Err(_) => {
                self.handle.shared.transition(ConnectionState::Disconnected);
                return Err(Error::Timeout { addr });
            }
        };
        let (reader, writer) = stream.into_split();

        self.handle.output.attach(Box::new(writer)).await;
        self.input = Some(InputBuffer::new(reader, timeout));
        self.handle.shared.transition(ConnectionState::Connected);
        info!(%addr, "Connected");
        Ok(())
    }

    /// Send `QUIT :<reason>`, close the socket and go `Disconnected`.
    ///
    /// The QUIT skips the pacing queue; lines still waiting there are dropped.
    /// A close error is returned, but the state changes regardless.
    pub async fn disconnect(&mut self, reason: &str) -> Result<()> {
        info!(reason, "Disconnecting...");
        self.handle.send_immediately(commands::quit(reason));
        let closed = self.handle.output.close().await;
        self.input = None;
        self.handle.shared.transition(ConnectionState::Disconnected);
        closed.map_err(Error::from)
    }

    /// Drop any live connection (after a pause), connect again and register.
    pub async fn reconnect(&mut self) -> Result<()> {
        if self.is_connected() {
            if let Err(e) = self.disconnect("Reconnecting").await {
                debug!("Ignoring close error while reconnecting: {e}");
            }
            info!("Pausing before reconnecting...");
            if !pause(&self.handle, self.config.reconnect_delay()).await {
                return Ok(());
            }
        }
        self.connect().await?;
        self.send_auth_details();
        self.handle.resume_identify();
        Ok(())
    }

    /// Registration: `NICK`, then `USER`.
    pub fn send_auth_details(&self) {
        if self.is_connected() {
            let name = &self.config.nickname;
            self.handle.send(commands::nick(name));
            self.handle.send(commands::user(name, &self.config.description));
        }
    }

    /// Try [`reconnect`](Self::reconnect) up to `retries` times.
    ///
    /// When the last attempt fails the client is stopped for good and
    /// [`Error::RetryExhausted`] is returned.
    pub async fn retry_connection(&mut self) -> Result<()> {
        let attempts = self.config.retries;
        for attempt in 1..=attempts {
            if self.handle.is_stopped() {
                return Ok(());
            }
            match self.reconnect().await {
                Ok(()) => return Ok(()),
                Err(_) if self.handle.is_stopped() => return Ok(()),
                Err(e) => {
                    warn!(attempt, attempts, "Socket error: {e}");
                    if attempt < attempts && !pause(&self.handle, self.config.retry_delay()).await {
                        return Ok(());
                    }
                }
            }
        }
        error!(attempts, "Reached maximum number of retries.");
        self.handle.stop();
        Err(Error::RetryExhausted { attempts })
    }

    /// The worker loop. Returns `Ok(())` after [`IrcHandle::stop`] and
    /// [`Error::RetryExhausted`] if the server could not be reached.
    pub async fn run(mut self) -> Result<()> {
        info!(nick = %self.config.nickname, "Bot is now running.");
        while !self.handle.is_stopped() {
            if !self.is_connected() {
                self.retry_connection().await?;
            } else {
                self.read_lines().await;
                if self.in_error() {
                    self.retry_connection().await?;
                }
            }
        }
        self.input = None;
        info!("Bot stopping.");
        Ok(())
    }

    /// Move the worker onto its own task.
    pub fn spawn(self) -> (IrcHandle, JoinHandle<Result<()>>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// Read and handle lines until stopped or either buffer is in error.
    async fn read_lines(&mut self) {
        let Some(mut input) = self.input.take() else {
            return;
        };
        read_until_error(&mut input, &mut self.dispatcher, &self.handle).await;
        self.input = Some(input);
    }

    fn in_error(&self) -> bool {
        self.handle.output.is_in_error()
            || self.input.as_ref().is_some_and(|input| input.is_in_error())
    }
}

/// Sleep for `delay` unless stopped first. Returns `false` if stopped.
async fn pause(irc: &IrcHandle, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = irc.wait_stopped() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Feed lines to the dispatcher until stopped or either side of the
/// connection is in error.
async fn read_until_error<R>(
    input: &mut InputBuffer<R>,
    dispatcher: &mut Dispatcher<IrcHandle>,
    irc: &IrcHandle,
) where
    R: AsyncRead + Unpin,
{
    while !(irc.is_stopped() || input.is_in_error() || irc.output.is_in_error()) {
        let line = tokio::select! {
            line = input.get_line() => line,
            _ = irc.output.failed() => None,
            _ = irc.shared.wake.notified() => None,
        };
        if let Some(line) = line {
            process_line(dispatcher, irc, &line);
        }
    }
}

fn process_line(dispatcher: &mut Dispatcher<IrcHandle>, irc: &IrcHandle, line: &str) {
    if line.is_empty() {
        return;
    }
    if line.starts_with("PING") {
        irc.send_immediately(commands::pong_for(line));
        return;
    }
    match Message::parse(line) {
        Ok(msg) => {
            if msg.is_numeric() {
                debug!("[{}] {}", msg.command, msg.trailing);
                irc.on_whois_reply(&msg);
            }
            dispatcher.dispatch(irc, &msg);
        }
        Err(e) => debug!("Skipping line: {e}"),
    }
}
