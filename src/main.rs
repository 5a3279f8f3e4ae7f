mod logging;

use anyhow::{Context, Result};
use lircbot::config::{self, ClientConfig};
use lircbot::{Client, Error, IrcHandle, Message};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::config_path);
    let cfg = config::load_config(&path)?;
    info!(config = %path.display(), server = %cfg.address(), "Loaded config");

    let mut client = Client::new(cfg.clone()).context("Invalid client config")?;
    bind_handlers(&mut client, &cfg);

    let (irc, worker) = client.spawn();
    let ctrl_c = {
        let irc = irc.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                irc.stop();
            }
        })
    };

    let result = worker.await.context("Bot task panicked")?;
    ctrl_c.abort();
    match result {
        Ok(()) => Ok(()),
        Err(e @ Error::RetryExhausted { .. }) => {
            error!("{e}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn bind_handlers(client: &mut Client, cfg: &ClientConfig) {
    // End of MOTD: registration is done.
    let channels = cfg.channels.clone();
    client.bind("376", move |irc, _| {
        for channel in &channels {
            irc.join(channel);
        }
    });

    client.bind("PRIVMSG", on_privmsg);

    client.bind("ACTION", |_, msg| {
        info!(to = ?msg.params.first(), "* {} {}", msg.sender, msg.trailing);
    });
}

fn on_privmsg(irc: &IrcHandle, msg: &Message) {
    let Some(target) = msg.params.first() else {
        return;
    };
    // Replies to a channel go to the channel, private messages back to the sender.
    let reply_to = if target.starts_with('#') {
        target.clone()
    } else {
        msg.sender.clone()
    };

    match msg.trailing.split_whitespace().next() {
        Some("!verify") => {
            let nick = msg.sender.clone();
            let accepted = (irc.clone(), reply_to.clone(), nick.clone());
            let rejected = (irc.clone(), reply_to, nick.clone());
            irc.identify(
                &nick,
                move || {
                    let (irc, to, nick) = accepted;
                    irc.say(&to, &format!("{nick} is identified."));
                },
                move || {
                    let (irc, to, nick) = rejected;
                    irc.say(&to, &format!("{nick} is not identified."));
                },
            );
        }
        Some("!wave") => irc.action(&reply_to, &format!("waves at {}", msg.sender)),
        _ => {}
    }
}
