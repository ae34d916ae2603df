//! Parsing of the lines typed at the prompt.

use anyhow::{anyhow, bail, Context};

use orkiv_shared::{Jid, Show};

pub const HELP: &str = "\
/list                 show the buddy list
/open <jid>           open the chat window with <jid>
/msg <jid> <text>     send <text> to <jid>
/show <value>         set own presence (available, chat, away, xa, dnd)
/json                 dump the buddy list as JSON
/quit                 disconnect and exit
<text>                send <text> to the open chat window";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(Jid),
    Send { to: Jid, body: String },
    /// Plain text for the open chat window
    Say(String),
    Presence(Show),
    Json,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            bail!("empty input");
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "list" => Ok(Self::List),
            "json" => Ok(Self::Json),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "open" => Ok(Self::Open(parse_jid(args)?)),
            "msg" => {
                let (to, body) = args
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: /msg <jid> <text>"))?;
                Ok(Self::Send {
                    to: parse_jid(to)?,
                    body: body.trim().to_string(),
                })
            }
            "show" => {
                let show: Show = args.parse()?;
                if show == Show::Offline {
                    bail!("use /quit to go offline");
                }
                Ok(Self::Presence(show))
            }
            other => bail!("unknown command /{other}, try /help"),
        }
    }
}

/// A `--contact` value: `jid` or `jid=Display Name`.
pub fn parse_contact(value: &str) -> anyhow::Result<(Jid, Option<String>)> {
    match value.split_once('=') {
        Some((jid, name)) => {
            let name = name.trim();
            Ok((parse_jid(jid)?, (!name.is_empty()).then(|| name.to_string())))
        }
        None => Ok((parse_jid(value)?, None)),
    }
}

fn parse_jid(s: &str) -> anyhow::Result<Jid> {
    Jid::parse(s).with_context(|| format!("invalid address {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jid(s: &str) -> Jid {
        Jid::parse(s).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/list").unwrap(), Command::List);
        assert_eq!(Command::parse("  /quit ").unwrap(), Command::Quit);
        assert_eq!(
            Command::parse("/open alice@example.org").unwrap(),
            Command::Open(jid("alice@example.org"))
        );
        assert_eq!(
            Command::parse("/msg bob@example.org  see you at 5").unwrap(),
            Command::Send {
                to: jid("bob@example.org"),
                body: "see you at 5".to_string()
            }
        );
        assert_eq!(
            Command::parse("/show away").unwrap(),
            Command::Presence(Show::Away)
        );
        assert_eq!(
            Command::parse("hello there").unwrap(),
            Command::Say("hello there".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("/msg bob@example.org").is_err());
        assert!(Command::parse("/open nobody").is_err());
        assert!(Command::parse("/show offline").is_err());
        assert!(Command::parse("/show sleepy").is_err());
        assert!(Command::parse("/dance").is_err());
    }

    #[test]
    fn test_parse_contact() {
        assert_eq!(
            parse_contact("alice@example.org=Alice Liddell").unwrap(),
            (jid("alice@example.org"), Some("Alice Liddell".to_string()))
        );
        assert_eq!(
            parse_contact("bob@example.org=").unwrap(),
            (jid("bob@example.org"), None)
        );
        assert!(parse_contact("=Nobody").is_err());
    }
}
