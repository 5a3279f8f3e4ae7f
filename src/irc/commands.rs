//! Outbound line formatters.
//!
//! Each function returns one IRC line without the CRLF terminator; the output
//! queue appends it. Arguments are scrubbed of CR and LF so no caller can smuggle
//! a second command onto the wire.

use super::parser::CTCP_DELIM;

fn clean(arg: &str) -> String {
    arg.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

pub fn nick(name: &str) -> String {
    format!("NICK {}", clean(name))
}

/// `USER <name> <name> <name> :<description>`
pub fn user(name: &str, description: &str) -> String {
    let name = clean(name);
    format!("USER {0} {0} {0} :{1}", name, clean(description))
}

pub fn join(channel: &str) -> String {
    format!("JOIN {}", clean(channel))
}

pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {} :{}", clean(target), clean(text))
}

/// A `/me` line: `PRIVMSG <target> :\x01ACTION <text>\x01`.
pub fn action(target: &str, text: &str) -> String {
    let text: String = clean(text).chars().filter(|c| *c != CTCP_DELIM).collect();
    format!(
        "PRIVMSG {} :{}ACTION {}{}",
        clean(target),
        CTCP_DELIM,
        text,
        CTCP_DELIM
    )
}

pub fn kick(channel: &str, nick: &str, reason: &str) -> String {
    format!("KICK {} {} :{}", clean(channel), clean(nick), clean(reason))
}

pub fn ban(channel: &str, mask: &str) -> String {
    format!("MODE {} +b {}", clean(channel), clean(mask))
}

pub fn unban(channel: &str, mask: &str) -> String {
    format!("MODE {} -b {}", clean(channel), clean(mask))
}

pub fn quit(reason: &str) -> String {
    format!("QUIT :{}", clean(reason))
}

pub fn whois(nick: &str) -> String {
    format!("WHOIS {}", clean(nick))
}

/// Reply to a server `PING` line, echoing its token verbatim.
///
/// `PING :irc.example.net` yields `PONG :irc.example.net`.
pub fn pong_for(ping_line: &str) -> String {
    match ping_line.split_whitespace().nth(1) {
        Some(token) => format!("PONG {}", clean(token)),
        None => "PONG".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_lines() {
        assert_eq!(nick("lirc"), "NICK lirc");
        assert_eq!(
            user("lirc", "An IRC bot"),
            "USER lirc lirc lirc :An IRC bot"
        );
    }

    #[test]
    fn test_channel_commands() {
        assert_eq!(join("#rust"), "JOIN #rust");
        assert_eq!(privmsg("#rust", "hi there"), "PRIVMSG #rust :hi there");
        assert_eq!(kick("#rust", "troll", "bye"), "KICK #rust troll :bye");
        assert_eq!(ban("#rust", "*!*@bad.host"), "MODE #rust +b *!*@bad.host");
        assert_eq!(unban("#rust", "*!*@bad.host"), "MODE #rust -b *!*@bad.host");
        assert_eq!(quit("Reconnecting"), "QUIT :Reconnecting");
        assert_eq!(whois("alice"), "WHOIS alice");
    }

    #[test]
    fn test_action_is_ctcp_framed() {
        assert_eq!(
            action("#rust", "waves"),
            "PRIVMSG #rust :\x01ACTION waves\x01"
        );
        assert_eq!(
            action("#rust", "sneaks \x01VERSION\x01"),
            "PRIVMSG #rust :\x01ACTION sneaks VERSION\x01"
        );
    }

    #[test]
    fn test_line_breaks_are_stripped() {
        assert_eq!(
            privmsg("#rust", "hello\r\nQUIT :pwned"),
            "PRIVMSG #rust :helloQUIT :pwned"
        );
        assert_eq!(join("#a\n#b"), "JOIN #a#b");
    }

    #[test]
    fn test_pong_echoes_token() {
        assert_eq!(pong_for("PING :irc.example.net"), "PONG :irc.example.net");
        assert_eq!(pong_for("PING 12345"), "PONG 12345");
        assert_eq!(pong_for("PING"), "PONG");
    }
}
