//! # orkiv
//!
//! Line-oriented chat client over the session core.
//!
//! The client logs in with a username and server, prints the buddy list,
//! and then reads commands from stdin. It talks to the in-memory loopback
//! transport: contacts given with `--contact` form the roster, show up as
//! available, and with `--echo` answer every message with itself.

mod commands;
mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orkiv_session::{LoopbackTransport, Sender, SessionConfig, SessionController, SessionEvent};
use orkiv_shared::constants::APP_NAME;
use orkiv_shared::{Credential, Jid, Show};

use crate::commands::{parse_contact, Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "orkiv", version, about = "Minimal chat client")]
struct Args {
    /// Account name, the part before '@'
    #[arg(long)]
    username: String,

    /// Server domain, the part after '@'
    #[arg(long)]
    server: String,

    #[arg(long, env = "ORKIV_PASSWORD", hide_env_values = true)]
    password: String,

    /// Roster contact, as `jid` or `jid=Display Name` (repeatable)
    #[arg(long = "contact")]
    contacts: Vec<String>,

    /// Contacts answer every message with the same text
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("orkiv_session=debug,orkiv_cli=info,warn")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::from_env();
    info!(?config, "Loaded configuration");

    let mut transport = LoopbackTransport::new().with_echo(args.echo);
    for value in &args.contacts {
        let (jid, name) = parse_contact(value)?;
        transport = transport
            .with_contact(&jid, name.as_deref())
            .with_contact_presence(&jid, "loopback", Show::Available, 0);
    }

    let controller = Arc::new(SessionController::new(Arc::new(transport), config));
    spawn_event_printer(&controller);

    controller
        .login(&args.username, &args.server, Credential::new(args.password))
        .await
        .context("Sorry, couldn't connect, check your credentials")?;

    println!("{}", render::buddy_list(&controller.list_contacts()));
    println!("Type /help for commands.");

    tokio::select! {
        result = prompt_loop(&controller) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Prompt failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    controller.disconnect().await;
    Ok(())
}

/// Print inbound messages and status changes as they happen.
fn spawn_event_printer(controller: &SessionController) {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::MessageAppended { entry, .. }) => {
                    if entry.sender != Sender::Me {
                        println!("{}", entry.render());
                    }
                }
                Ok(SessionEvent::StatusChanged { status }) => println!("* {status}"),
                Ok(SessionEvent::PresenceChanged { peer, presence }) => {
                    println!("* {peer} is {}", presence.show);
                }
                Ok(SessionEvent::RosterReplaced { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn prompt_loop(controller: &SessionController) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut open_chat: Option<Jid> = None;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("! {e:#}");
                continue;
            }
        };
        if !execute(controller, command, &mut open_chat).await {
            break;
        }
    }
    Ok(())
}

/// Run one command. Returns `false` when the user asked to quit.
async fn execute(
    controller: &SessionController,
    command: Command,
    open_chat: &mut Option<Jid>,
) -> bool {
    match command {
        Command::List => println!("{}", render::buddy_list(&controller.list_contacts())),
        Command::Json => match serde_json::to_string_pretty(&controller.list_contacts()) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("! {e}"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Open(peer) => {
            let peer = peer.bare();
            println!("{}", render::chat_window(&peer, &controller.history(&peer)));
            *open_chat = Some(peer);
        }
        Command::Send { to, body } => send(controller, &to, &body).await,
        Command::Say(body) => match open_chat.as_ref() {
            Some(peer) => send(controller, peer, &body).await,
            None => println!("! open a chat first with /open <jid>"),
        },
        Command::Presence(show) => {
            if let Err(e) = controller.set_presence(show).await {
                println!("! {e}");
            }
        }
    }
    true
}

async fn send(controller: &SessionController, to: &Jid, body: &str) {
    match controller.send_message(to, body).await {
        Ok(entry) => println!("{}", entry.render()),
        Err(e) => println!("! {e}"),
    }
}
