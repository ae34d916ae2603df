//! Roster and presence tracking.
//!
//! Keeps one entry per bare contact address with the contact's metadata and
//! the live presence of each of its connected resources. The store is a
//! best-effort cache of server state: lookups for unknown contacts answer
//! "offline" instead of failing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use orkiv_shared::{EffectivePresence, Jid, PresenceRecord, RosterSnapshot, Subscription};

/// A contact and the presences of its resources, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub jid: Jid,
    pub display_name: String,
    pub subscription: Subscription,
    presences: Vec<PresenceRecord>,
}

impl ContactEntry {
    fn new(jid: Jid, name: Option<&str>, subscription: Subscription) -> Self {
        let display_name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => jid.local().to_string(),
        };
        Self {
            jid,
            display_name,
            subscription,
            presences: Vec::new(),
        }
    }

    /// Presence records in the order they were last received.
    pub fn presences(&self) -> &[PresenceRecord] {
        &self.presences
    }

    /// Highest priority wins; among equals the most recently received.
    pub fn effective_presence(&self) -> EffectivePresence {
        // max_by_key yields the last of several equal maxima, and records
        // are kept in arrival order.
        self.presences
            .iter()
            .max_by_key(|p| p.priority)
            .map(EffectivePresence::from)
            .unwrap_or_else(EffectivePresence::offline)
    }
}

/// What a presence stanza does to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// The resource is online with this presence.
    Available(PresenceRecord),
    /// The resource went offline.
    Unavailable { resource: String },
}

impl PresenceUpdate {
    pub fn resource(&self) -> &str {
        match self {
            Self::Available(record) => &record.resource,
            Self::Unavailable { resource } => resource,
        }
    }
}

/// One row of the buddy list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactView {
    pub jid: Jid,
    pub display_name: String,
    pub subscription: Subscription,
    pub presence: EffectivePresence,
}

/// Contacts keyed by bare address.
#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    contacts: BTreeMap<Jid, ContactEntry>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with the contents of `snapshot`.
    ///
    /// Duplicate addresses collapse into one entry; the last item wins.
    pub fn replace(&mut self, snapshot: RosterSnapshot) {
        self.contacts.clear();
        for item in snapshot.items {
            let jid = item.jid.bare();
            let entry = ContactEntry::new(jid.clone(), item.name.as_deref(), item.subscription);
            self.contacts.insert(jid, entry);
        }
        debug!(contacts = self.contacts.len(), "Roster replaced");
    }

    /// Apply a presence change for `jid`.
    ///
    /// Returns `false` when the contact is not in the roster; the update is
    /// then discarded.
    pub fn apply_presence(&mut self, jid: &Jid, update: PresenceUpdate) -> bool {
        let Some(entry) = self.contacts.get_mut(&jid.bare()) else {
            debug!(peer = %jid, "Ignoring presence for contact outside the roster");
            return false;
        };

        entry
            .presences
            .retain(|p| p.resource != update.resource());

        match update {
            PresenceUpdate::Available(record) => {
                debug!(
                    peer = %entry.jid,
                    resource = %record.resource,
                    show = %record.show,
                    priority = record.priority,
                    "Presence updated"
                );
                entry.presences.push(record);
            }
            PresenceUpdate::Unavailable { resource } => {
                debug!(peer = %entry.jid, resource = %resource, "Resource went offline");
            }
        }
        true
    }

    /// Effective presence of a contact, offline when unknown.
    pub fn effective_presence(&self, jid: &Jid) -> EffectivePresence {
        self.contacts
            .get(&jid.bare())
            .map(ContactEntry::effective_presence)
            .unwrap_or_else(EffectivePresence::offline)
    }

    /// All contacts, sorted by address.
    pub fn list_contacts(&self) -> Vec<ContactView> {
        self.contacts
            .values()
            .map(|entry| ContactView {
                jid: entry.jid.clone(),
                display_name: entry.display_name.clone(),
                subscription: entry.subscription,
                presence: entry.effective_presence(),
            })
            .collect()
    }

    pub fn get(&self, jid: &Jid) -> Option<&ContactEntry> {
        self.contacts.get(&jid.bare())
    }

    pub fn contains(&self, jid: &Jid) -> bool {
        self.contacts.contains_key(&jid.bare())
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use orkiv_shared::{RosterItem, Show};

    use super::*;

    fn jid(s: &str) -> Jid {
        Jid::parse(s).unwrap()
    }

    fn roster(addrs: &[&str]) -> RosterStore {
        let mut store = RosterStore::new();
        store.replace(RosterSnapshot {
            items: addrs.iter().map(|a| RosterItem::new(jid(a), None)).collect(),
        });
        store
    }

    fn available(resource: &str, show: Show, priority: i8) -> PresenceUpdate {
        PresenceUpdate::Available(PresenceRecord {
            resource: resource.to_string(),
            status_text: String::new(),
            show,
            priority,
            received_at: Utc::now(),
        })
    }

    fn offline(resource: &str) -> PresenceUpdate {
        PresenceUpdate::Unavailable {
            resource: resource.to_string(),
        }
    }

    #[test]
    fn test_priority_wins_and_removal_reverts() {
        let mut store = roster(&["alice@example.org"]);
        let alice = jid("alice@example.org");

        assert!(store.apply_presence(&alice, available("phone", Show::Away, 5)));
        assert!(store.apply_presence(&alice, available("desktop", Show::Available, 10)));
        assert_eq!(store.effective_presence(&alice).show, Show::Available);

        assert!(store.apply_presence(&alice, offline("desktop")));
        assert_eq!(store.effective_presence(&alice).show, Show::Away);

        assert!(store.apply_presence(&alice, offline("phone")));
        assert_eq!(store.effective_presence(&alice), EffectivePresence::offline());
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let mut store = roster(&["bob@example.org"]);
        let bob = jid("bob@example.org");

        store.apply_presence(&bob, available("a", Show::Dnd, 1));
        store.apply_presence(&bob, available("b", Show::Chat, 1));
        assert_eq!(store.effective_presence(&bob).show, Show::Chat);

        // Re-announcing "a" makes it the most recent of the two
        store.apply_presence(&bob, available("a", Show::Xa, 1));
        assert_eq!(store.effective_presence(&bob).show, Show::Xa);
        assert_eq!(store.get(&bob).unwrap().presences().len(), 2);
    }

    #[test]
    fn test_upsert_replaces_same_resource() {
        let mut store = roster(&["carol@example.org"]);
        let carol = jid("carol@example.org/phone");

        store.apply_presence(&carol, available("phone", Show::Away, 3));
        store.apply_presence(&carol, available("phone", Show::Available, 3));
        let entry = store.get(&carol).unwrap();
        assert_eq!(entry.presences().len(), 1);
        assert_eq!(entry.effective_presence().show, Show::Available);
    }

    #[test]
    fn test_unknown_contact_is_offline() {
        let mut store = roster(&["alice@example.org"]);
        let stranger = jid("mallory@example.org");

        assert!(!store.apply_presence(&stranger, available("x", Show::Chat, 0)));
        assert_eq!(store.effective_presence(&stranger), EffectivePresence::offline());
        assert!(!store.contains(&stranger));
    }

    #[test]
    fn test_list_is_sorted_and_stable() {
        let store = roster(&["zed@example.org", "amy@example.org", "Mike@example.org"]);
        let first: Vec<String> = store
            .list_contacts()
            .iter()
            .map(|c| c.jid.to_string())
            .collect();
        assert_eq!(
            first,
            vec!["amy@example.org", "mike@example.org", "zed@example.org"]
        );
        let second: Vec<String> = store
            .list_contacts()
            .iter()
            .map(|c| c.jid.to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut store = roster(&["alice@example.org", "bob@example.org"]);
        let alice = jid("alice@example.org");
        store.apply_presence(&alice, available("phone", Show::Chat, 0));

        store.replace(RosterSnapshot {
            items: vec![
                RosterItem::new(jid("alice@example.org"), Some("Alice")),
                RosterItem::new(jid("dave@example.org/ignored"), Some("  ")),
            ],
        });

        assert_eq!(store.len(), 2);
        assert!(!store.contains(&jid("bob@example.org")));
        assert_eq!(store.effective_presence(&alice), EffectivePresence::offline());
        let views = store.list_contacts();
        assert_eq!(views[0].display_name, "Alice");
        assert_eq!(views[0].subscription, Subscription::Both);
        assert_eq!(views[1].display_name, "dave");
        assert!(views[1].jid.is_bare());
    }
}
