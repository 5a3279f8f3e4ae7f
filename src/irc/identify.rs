//! WHOIS-based nick verification.
//!
//! Callers ask whether a nick is identified to services. Requests queue up and
//! are answered one WHOIS at a time:
//!
//! - `307`/`330` naming a nick accepts every queued request for that nick;
//! - `318` (end of WHOIS) naming a nick rejects what is still queued for it;
//!   when it ends the WHOIS in flight, the next nick in the queue is queried.
//!
//! The coordinator never sends or calls anything itself. Each operation
//! returns an [`IdentifyStep`] so the caller can drop its lock before running
//! callbacks, which are then free to call `identify` again.

use std::collections::VecDeque;
use tracing::debug;

use super::parser::Message;

pub const RPL_WHOISREGNICK: &str = "307";
pub const RPL_ENDOFWHOIS: &str = "318";
pub const RPL_WHOISACCOUNT: &str = "330";

pub type Callback = Box<dyn FnOnce() + Send>;

struct IdentifyRequest {
    nick: String,
    on_accept: Callback,
    on_reject: Callback,
}

/// Work produced by the coordinator: callbacks to run, then maybe a WHOIS.
#[derive(Default)]
#[must_use]
pub struct IdentifyStep {
    pub callbacks: Vec<Callback>,
    pub whois: Option<String>,
}

impl IdentifyStep {
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty() && self.whois.is_none()
    }
}

#[derive(Default)]
pub struct IdentifyCoordinator {
    queue: VecDeque<IdentifyRequest>,
    /// Nick whose WHOIS is in flight. `Some` is the lock.
    outstanding: Option<String>,
}

impl IdentifyCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request. Yields a WHOIS if none is in flight.
    pub fn request(&mut self, nick: &str, on_accept: Callback, on_reject: Callback) -> IdentifyStep {
        debug!(nick, "Verifying nick");
        self.queue.push_back(IdentifyRequest {
            nick: nick.to_string(),
            on_accept,
            on_reject,
        });
        let mut step = IdentifyStep::default();
        if self.outstanding.is_none() {
            self.outstanding = Some(nick.to_string());
            step.whois = Some(nick.to_string());
        }
        step
    }

    /// Feed a server reply. Anything but 307/318/330 yields an empty step.
    pub fn on_reply(&mut self, msg: &Message) -> IdentifyStep {
        let Some(nick) = msg.params.get(1) else {
            return IdentifyStep::default();
        };
        match msg.command.as_str() {
            RPL_WHOISREGNICK | RPL_WHOISACCOUNT => self.accept(nick),
            RPL_ENDOFWHOIS => self.end_of_whois(nick),
            _ => IdentifyStep::default(),
        }
    }

    /// Accept every queued request for `nick`.
    pub fn accept(&mut self, nick: &str) -> IdentifyStep {
        let accepted = self.drain(nick);
        if !accepted.is_empty() {
            debug!(nick, count = accepted.len(), "Nick identified");
        }
        IdentifyStep {
            callbacks: accepted.into_iter().map(|r| r.on_accept).collect(),
            whois: None,
        }
    }

    /// WHOIS for `nick` finished: reject what is still queued for it.
    ///
    /// If that WHOIS was the one in flight (or the in-flight nick has already
    /// left the queue), move on to the next head or release the lock.
    pub fn end_of_whois(&mut self, nick: &str) -> IdentifyStep {
        let rejected = self.drain(nick);
        if !rejected.is_empty() {
            debug!(nick, count = rejected.len(), "Nick not identified");
        }
        let callbacks = rejected.into_iter().map(|r| r.on_reject).collect();

        let advance = match self.outstanding.as_deref() {
            Some(current) => {
                current.eq_ignore_ascii_case(nick)
                    || !self.queue.iter().any(|r| r.nick.eq_ignore_ascii_case(current))
            }
            None => true,
        };
        if !advance {
            return IdentifyStep {
                callbacks,
                whois: None,
            };
        }

        let next = self.queue.front().map(|r| r.nick.clone());
        self.outstanding = next.clone();
        IdentifyStep {
            callbacks,
            whois: next,
        }
    }

    /// Re-query the queue head on a fresh connection; the reply to the
    /// previous WHOIS went down with the old socket.
    pub fn resume(&mut self) -> IdentifyStep {
        let head = self.queue.front().map(|r| r.nick.clone());
        self.outstanding = head.clone();
        IdentifyStep {
            callbacks: Vec::new(),
            whois: head,
        }
    }

    pub fn outstanding(&self) -> Option<&str> {
        self.outstanding.as_deref()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn drain(&mut self, nick: &str) -> Vec<IdentifyRequest> {
        let mut matched = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for request in self.queue.drain(..) {
            if request.nick.eq_ignore_ascii_case(nick) {
                matched.push(request);
            } else {
                kept.push_back(request);
            }
        }
        self.queue = kept;
        matched
    }
}
