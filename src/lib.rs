//! Embeddable IRC client engine.
//!
//! A [`Client`] owns one server connection. Bind handlers to commands, then
//! run it; handlers receive an [`IrcHandle`] for replying, moderating and
//! asking services whether a nick is identified. Lost connections are retried
//! a bounded number of times before the client stops.
//!
//! ```no_run
//! use lircbot::{Client, ClientConfig};
//!
//! # async fn demo() -> lircbot::Result<()> {
//! let mut client = Client::new(ClientConfig::new("irc.example.net", 6667, "HelperBot"))?;
//! client.bind("PRIVMSG", |irc, msg| {
//!     if msg.trailing == "!ping" {
//!         irc.say(&msg.params[0], "pong");
//!     }
//! });
//! client.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod irc;

pub use config::ClientConfig;
pub use error::{CodecError, ConfigError, Error, ProtocolError, Result};
pub use irc::connection::{Client, ConnectionState};
pub use irc::handle::IrcHandle;
pub use irc::parser::Message;
