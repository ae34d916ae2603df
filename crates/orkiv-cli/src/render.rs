//! Text rendering of the buddy list and chat windows.

use orkiv_session::{ContactView, LogEntry};
use orkiv_shared::{Jid, Subscription};

/// One buddy list line: address, name, presence, status message. Contacts
/// without a mutual subscription are flagged.
pub fn buddy_row(contact: &ContactView) -> String {
    let presence = &contact.presence;
    let mut row = format!(
        "{:<32} {:<20} [{}]",
        contact.jid.to_string(),
        contact.display_name,
        presence.show
    );
    if !presence.status_text.is_empty() {
        row.push(' ');
        row.push_str(&presence.status_text);
    }
    if contact.subscription != Subscription::Both {
        row.push_str(" (subscription: ");
        row.push_str(contact.subscription.as_str());
        row.push(')');
    }
    row
}

pub fn buddy_list(contacts: &[ContactView]) -> String {
    if contacts.is_empty() {
        return "(no contacts)".to_string();
    }
    contacts
        .iter()
        .map(buddy_row)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn chat_window(peer: &Jid, entries: &[LogEntry]) -> String {
    let mut out = format!("--- Chat with {peer} ---");
    for entry in entries {
        out.push('\n');
        out.push_str(&entry.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use orkiv_shared::{EffectivePresence, Show};

    use super::*;

    fn contact(jid: &str, name: &str, show: Show, status: &str) -> ContactView {
        ContactView {
            jid: Jid::parse(jid).unwrap(),
            display_name: name.to_string(),
            subscription: Subscription::Both,
            presence: EffectivePresence {
                show,
                status_text: status.to_string(),
            },
        }
    }

    #[test]
    fn test_buddy_row() {
        let row = buddy_row(&contact("alice@example.org", "Alice", Show::Away, "lunch"));
        assert!(row.starts_with("alice@example.org "));
        assert!(row.contains("Alice"));
        assert!(row.ends_with("[away] lunch"));

        let row = buddy_row(&contact("bob@example.org", "bob", Show::Offline, ""));
        assert!(row.ends_with("[offline]"));
    }

    #[test]
    fn test_pending_subscription_is_flagged() {
        let pending = ContactView {
            subscription: Subscription::To,
            ..contact("dave@example.org", "dave", Show::Offline, "")
        };
        assert!(buddy_row(&pending).ends_with("[offline] (subscription: to)"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(buddy_list(&[]), "(no contacts)");
    }

    #[test]
    fn test_chat_window() {
        let peer = Jid::parse("carol@example.org").unwrap();
        let entries = vec![LogEntry::outbound("hi"), LogEntry::inbound(&peer, "hey")];
        let text = chat_window(&peer, &entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "--- Chat with carol@example.org ---");
        assert!(lines[1].ends_with(") Me: hi"));
        assert!(lines[2].ends_with(") carol@example.org: hey"));
    }
}
