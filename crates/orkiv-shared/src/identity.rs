use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JidError;

/// Characters a local part may not contain.
const LOCAL_FORBIDDEN: &[char] = &['"', '&', '\'', '/', ':', '<', '>', '@'];

/// A validated peer address: `local@domain[/resource]`.
///
/// Local part and domain are lowercased; the resource is kept verbatim.
/// Construction fails for malformed input, so every `Jid` in the system
/// has a non-empty local part and domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    local: String,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    /// Parse an address such as `alice@example.org/phone`.
    pub fn parse(input: &str) -> Result<Self, JidError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(JidError::Empty);
        }

        let (bare, resource) = match input.split_once('/') {
            Some((_, "")) => return Err(JidError::EmptyResource),
            Some((bare, resource)) => (bare, Some(resource.to_string())),
            None => (input, None),
        };

        let (local, domain) = bare.split_once('@').ok_or(JidError::MissingAt)?;
        if domain.contains('@') {
            return Err(JidError::TooManyAt);
        }

        Self::from_parts(local, domain, resource.as_deref())
    }

    /// Build an address from its parts, as the login form does with
    /// a username and a server name.
    pub fn from_parts(
        local: &str,
        domain: &str,
        resource: Option<&str>,
    ) -> Result<Self, JidError> {
        if local.is_empty() {
            return Err(JidError::EmptyLocal);
        }
        if domain.is_empty() {
            return Err(JidError::EmptyDomain);
        }
        if let Some(c) = local
            .chars()
            .find(|c| c.is_whitespace() || LOCAL_FORBIDDEN.contains(c))
        {
            return Err(JidError::InvalidChar(c));
        }
        if let Some(c) = domain
            .chars()
            .find(|c| c.is_whitespace() || *c == '@' || *c == '/')
        {
            return Err(JidError::InvalidChar(c));
        }
        if resource == Some("") {
            return Err(JidError::EmptyResource);
        }

        Ok(Self {
            local: local.to_lowercase(),
            domain: domain.to_lowercase(),
            resource: resource.map(str::to_string),
        })
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The address with its resource stripped.
    pub fn bare(&self) -> Jid {
        Self {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    /// The same bare address bound to another resource.
    pub fn with_resource(&self, resource: &str) -> Result<Jid, JidError> {
        Self::from_parts(&self.local, &self.domain, Some(resource))
    }

    fn bare_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.local
            .chars()
            .chain(std::iter::once('@'))
            .chain(self.domain.chars())
    }
}

// Ordered by the textual bare address, then resource, so sorted rosters
// read alphabetically.
impl Ord for Jid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bare_chars()
            .cmp(other.bare_chars())
            .then_with(|| self.resource.cmp(&other.resource))
    }
}

impl PartialOrd for Jid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Jid {
    type Error = JidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

/// Account password. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let jid = Jid::parse("Alice@Example.org/Phone").unwrap();
        assert_eq!(jid.local(), "alice");
        assert_eq!(jid.domain(), "example.org");
        assert_eq!(jid.resource(), Some("Phone"));
        assert_eq!(jid.to_string(), "alice@example.org/Phone");
        assert_eq!(jid.bare().to_string(), "alice@example.org");
    }

    #[test]
    fn test_resource_may_contain_separators() {
        let jid = Jid::parse("bob@example.org/work/laptop@home").unwrap();
        assert_eq!(jid.resource(), Some("work/laptop@home"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Jid::parse(""), Err(JidError::Empty));
        assert_eq!(Jid::parse("example.org"), Err(JidError::MissingAt));
        assert_eq!(Jid::parse("@example.org"), Err(JidError::EmptyLocal));
        assert_eq!(Jid::parse("alice@"), Err(JidError::EmptyDomain));
        assert_eq!(Jid::parse("a@b@c"), Err(JidError::TooManyAt));
        assert_eq!(Jid::parse("alice@example.org/"), Err(JidError::EmptyResource));
        assert_eq!(
            Jid::parse("al ice@example.org"),
            Err(JidError::InvalidChar(' '))
        );
    }

    #[test]
    fn test_login_form_parts() {
        let jid = Jid::from_parts("carol", "jabber.example", None).unwrap();
        assert_eq!(jid.to_string(), "carol@jabber.example");
        assert!(Jid::from_parts("", "jabber.example", None).is_err());
    }

    #[test]
    fn test_ordering_is_textual() {
        let mut jids: Vec<Jid> = ["a@x.org", "a.b@x.org", "ab@x.org", "a@w.org"]
            .iter()
            .map(|s| Jid::parse(s).unwrap())
            .collect();
        jids.sort();
        let sorted: Vec<String> = jids.iter().map(|j| j.to_string()).collect();
        assert_eq!(sorted, vec!["a.b@x.org", "a@w.org", "a@x.org", "ab@x.org"]);
    }

    #[test]
    fn test_serde_as_string() {
        let jid = Jid::parse("dave@example.org/desk").unwrap();
        let json = serde_json::to_string(&jid).unwrap();
        assert_eq!(json, "\"dave@example.org/desk\"");
        let back: Jid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, jid);
        assert!(serde_json::from_str::<Jid>("\"nope\"").is_err());
    }

    #[test]
    fn test_credential_debug_redacted() {
        let cred = Credential::new("hunter2");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.expose(), "hunter2");
    }
}
