//! Command dispatch: one handler per command name.

use std::collections::HashMap;
use tracing::debug;

use super::parser::Message;

type Handler<C> = Box<dyn FnMut(&C, &Message) + Send>;

/// Routes parsed messages to the handler bound to their command.
///
/// Command names match ASCII-case-insensitively, so `privmsg` and `PRIVMSG`
/// are the same binding. `C` is the context handed to every handler; the
/// client passes its [`IrcHandle`](crate::IrcHandle).
pub struct Dispatcher<C> {
    bindings: HashMap<String, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `command`, replacing any previous handler.
    /// Returns `true` if one was replaced.
    pub fn bind<F>(&mut self, command: &str, handler: F) -> bool
    where
        F: FnMut(&C, &Message) + Send + 'static,
    {
        self.bindings
            .insert(command.to_ascii_uppercase(), Box::new(handler))
            .is_some()
    }

    /// Remove the handler for `command`. Returns `true` if there was one.
    pub fn unbind(&mut self, command: &str) -> bool {
        self.bindings.remove(&command.to_ascii_uppercase()).is_some()
    }

    pub fn is_bound(&self, command: &str) -> bool {
        self.bindings.contains_key(&command.to_ascii_uppercase())
    }

    /// Invoke the handler for `msg.command`. Returns `false` if none is bound.
    pub fn dispatch(&mut self, ctx: &C, msg: &Message) -> bool {
        match self.bindings.get_mut(&msg.command.to_ascii_uppercase()) {
            Some(handler) => {
                handler(ctx, msg);
                true
            }
            None => {
                debug!(command = %msg.command, "No binding");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn msg(line: &str) -> Message {
        Message::parse(line).unwrap()
    }

    #[test]
    fn test_dispatches_sender_params_and_trailing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::<()>::new();
        let log = Arc::clone(&seen);
        dispatcher.bind("PRIVMSG", move |_, m| {
            log.lock()
                .unwrap()
                .push((m.sender.clone(), m.params.clone(), m.trailing.clone()));
        });

        assert!(dispatcher.dispatch(&(), &msg(":nick!u@h PRIVMSG #chan :hello")));
        assert!(dispatcher.dispatch(&(), &msg(":nick!u@h PRIVMSG #chan :again")));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("nick".to_string(), vec!["#chan".to_string()], "hello".to_string()),
                ("nick".to_string(), vec!["#chan".to_string()], "again".to_string()),
            ]
        );
    }

    #[test]
    fn test_rebinding_replaces_the_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::<()>::new();

        let log = Arc::clone(&calls);
        assert!(!dispatcher.bind("JOIN", move |_, _| log.lock().unwrap().push("first")));
        let log = Arc::clone(&calls);
        assert!(dispatcher.bind("join", move |_, _| log.lock().unwrap().push("second")));

        dispatcher.dispatch(&(), &msg(":nick!u@h JOIN #chan"));
        assert_eq!(*calls.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_unbound_commands_are_ignored() {
        let mut dispatcher = Dispatcher::<()>::new();
        assert!(!dispatcher.dispatch(&(), &msg(":server 001 bot :Welcome")));

        dispatcher.bind("001", |_, _| {});
        assert!(dispatcher.is_bound("001"));
        assert!(dispatcher.unbind("001"));
        assert!(!dispatcher.dispatch(&(), &msg(":server 001 bot :Welcome")));
    }

    #[test]
    fn test_handler_sees_context() {
        let mut dispatcher = Dispatcher::<Mutex<Vec<String>>>::new();
        dispatcher.bind("ACTION", |out, m| {
            out.lock().unwrap().push(format!("* {} {}", m.sender, m.trailing));
        });

        let out = Mutex::new(Vec::new());
        dispatcher.dispatch(&out, &msg(":nick!u@h PRIVMSG #c :\x01ACTION waves\x01"));
        assert_eq!(out.into_inner().unwrap(), vec!["* nick waves"]);
    }
}
