//! IRC line parser.
//!
//! Splits one raw line (without CRLF) into sender, command, middle parameters
//! and trailing text:
//!
//!   `[:sender[!user@host] SPACE] command {SPACE param} [SPACE :trailing]`
//!
//! The trailing marker is the first colon that starts a token after the
//! prefix, so colons inside a prefix or inside a middle parameter (IPv6 hosts
//! in `311`, ban masks) do not split the line.

use crate::error::ProtocolError;

/// CTCP framing byte.
pub const CTCP_DELIM: char = '\x01';

/// A parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Nick or server name from the prefix, without `!user@host`. Empty when
    /// the line had no prefix.
    pub sender: String,
    /// Command name or three-digit numeric. `PRIVMSG` lines carrying a CTCP
    /// ACTION are re-tagged `ACTION`.
    pub command: String,
    /// Middle parameters, in order.
    pub params: Vec<String>,
    /// Text after the trailing marker, empty if there was none.
    pub trailing: String,
}

impl Message {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }

        let (has_prefix, body) = match line.strip_prefix(':') {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let search_from = if has_prefix {
            body.find(' ').unwrap_or(body.len())
        } else {
            0
        };
        let (head, trailing) = match find_trailing(body, search_from) {
            Some(colon) => (&body[..colon], &body[colon + 1..]),
            None => (body, ""),
        };

        let mut tokens = head.split_whitespace();
        let sender = if has_prefix {
            let prefix = tokens
                .next()
                .ok_or_else(|| ProtocolError::TooFewTokens(line.to_string()))?;
            match prefix.find('!') {
                Some(cut) => &prefix[..cut],
                None => prefix,
            }
        } else {
            ""
        };
        let command = tokens
            .next()
            .ok_or_else(|| ProtocolError::TooFewTokens(line.to_string()))?;

        let (command, trailing) = match ctcp_action(trailing) {
            Some(text) if command.eq_ignore_ascii_case("PRIVMSG") => ("ACTION", text),
            _ => (command, trailing),
        };

        Ok(Message {
            sender: sender.to_string(),
            command: command.to_string(),
            params: tokens.map(str::to_owned).collect(),
            trailing: trailing.to_string(),
        })
    }

    /// True for three-digit server replies such as `318`.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Index of the colon that opens the trailing text, searching from `from`.
fn find_trailing(body: &str, from: usize) -> Option<usize> {
    body[from..].find(" :").map(|i| from + i + 1)
}

/// Inner text of `\x01ACTION <text>\x01`, if `trailing` is framed that way.
fn ctcp_action(trailing: &str) -> Option<&str> {
    trailing
        .strip_prefix(CTCP_DELIM)?
        .strip_suffix(CTCP_DELIM)?
        .strip_prefix("ACTION ")
}
