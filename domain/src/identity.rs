//! Identities used when pushing a change upstream.

use serde::{Deserialize, Serialize};

/// Owner of a change as reported by the review server.
///
/// Every field may be missing (e.g. accounts without a username).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOwner {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Name and email recorded as commit identity (`user.name` / `user.email`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

impl GitIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Whose credentials an upstream push is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    ChangeOwner,
    ServiceAccount,
}

/// Account and commit identity resolved for one upstream push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushIdentity {
    pub username: String,
    pub name: String,
    pub email: String,
    pub source: IdentitySource,
}

impl PushIdentity {
    /// Prefer the change owner; fall back to the service account when the
    /// owner has no username.
    ///
    /// The fallback replaces all three fields, even if the owner's name or
    /// email are known. Every owner without a discoverable username therefore
    /// pushes upstream as the shared service identity, which is a coarse
    /// authorization boundary operators must be aware of.
    pub fn resolve(owner: &ChangeOwner, service_username: &str, service: &GitIdentity) -> Self {
        match &owner.username {
            Some(username) if !username.is_empty() => Self {
                username: username.clone(),
                name: owner.name.clone().unwrap_or_default(),
                email: owner.email.clone().unwrap_or_default(),
                source: IdentitySource::ChangeOwner,
            },
            _ => Self {
                username: service_username.to_string(),
                name: service.name.clone(),
                email: service.email.clone(),
                source: IdentitySource::ServiceAccount,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> GitIdentity {
        GitIdentity::new("Relay Bot", "relay@example.org")
    }

    #[test]
    fn test_owner_identity_preferred() {
        let owner = ChangeOwner {
            username: Some("alice".into()),
            name: Some("Alice".into()),
            email: Some("alice@example.org".into()),
        };
        let identity = PushIdentity::resolve(&owner, "relay-bot", &service());
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.email, "alice@example.org");
        assert_eq!(identity.source, IdentitySource::ChangeOwner);
    }

    #[test]
    fn test_missing_username_uses_service_identity_entirely() {
        let owner = ChangeOwner {
            username: None,
            name: Some("Alice".into()),
            email: Some("alice@example.org".into()),
        };
        let identity = PushIdentity::resolve(&owner, "relay-bot", &service());
        assert_eq!(identity.username, "relay-bot");
        assert_eq!(identity.name, "Relay Bot");
        assert_eq!(identity.email, "relay@example.org");
        assert_eq!(identity.source, IdentitySource::ServiceAccount);
    }

    #[test]
    fn test_empty_username_counts_as_missing() {
        let owner = ChangeOwner {
            username: Some(String::new()),
            ..Default::default()
        };
        let identity = PushIdentity::resolve(&owner, "relay-bot", &service());
        assert_eq!(identity.source, IdentitySource::ServiceAccount);
    }
}
