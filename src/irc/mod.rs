//! IRC protocol layer: line framing, parsing, dispatch, paced output and the
//! reconnecting connection manager.

pub mod codec;
pub mod commands;
pub mod connection;
pub mod dispatch;
pub mod handle;
pub mod identify;
pub mod input;
pub mod output;
pub mod parser;
