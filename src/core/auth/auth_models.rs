// Auth domain models - who is acting, and whether they may moderate.
//
// Principals come from the auth collaborator and are never persisted. Which
// identities are admins is configuration (RolePolicy), not code.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Email address or opaque subject id.
    pub identity: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn admin(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_admin: true,
        }
    }

    pub fn member(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_admin: false,
        }
    }

    /// An admin with a usable identity. Audit records need the identity.
    pub fn can_moderate(&self) -> bool {
        self.is_admin && !self.identity.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

/// Maps identities to roles. Comparison ignores case and surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    admins: HashSet<String>,
}

impl RolePolicy {
    pub fn from_admins<I, T>(admins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let admins = admins
            .into_iter()
            .map(|identity| normalize(identity.as_ref()))
            .filter(|identity| !identity.is_empty())
            .collect();
        Self { admins }
    }

    /// Parse a comma-separated admin list, e.g. from an environment variable.
    pub fn from_csv(list: &str) -> Self {
        Self::from_admins(list.split(','))
    }

    pub fn role_for(&self, identity: &str) -> Role {
        if self.admins.contains(&normalize(identity)) {
            Role::Admin
        } else {
            Role::Member
        }
    }

    /// Build the principal for an authenticated identity. Blank identities yield `None`.
    pub fn principal_for(&self, identity: &str) -> Option<Principal> {
        let identity = identity.trim();
        if identity.is_empty() {
            return None;
        }
        Some(Principal {
            identity: identity.to_string(),
            is_admin: self.role_for(identity) == Role::Admin,
        })
    }

    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }
}

fn normalize(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Per-request credentials handed over by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Identity already established by a session layer.
    pub subject: Option<String>,
    /// Raw bearer token, for resolvers that verify credentials themselves.
    pub bearer_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(token: impl Into<String>) -> Self {
        Self {
            subject: None,
            bearer_token: Some(token.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_matches_case_insensitively() {
        let policy = RolePolicy::from_csv(" Owner@Example.com , ,mod@example.com");

        assert_eq!(policy.admin_count(), 2);
        assert_eq!(policy.role_for("owner@example.com"), Role::Admin);
        assert_eq!(policy.role_for("MOD@example.com "), Role::Admin);
        assert_eq!(policy.role_for("visitor@example.com"), Role::Member);
    }

    #[test]
    fn test_principal_for_blank_identity_is_none() {
        let policy = RolePolicy::from_admins(["owner@example.com"]);

        assert!(policy.principal_for("   ").is_none());
        let principal = policy.principal_for("owner@example.com").unwrap();
        assert!(principal.can_moderate());
        let principal = policy.principal_for("visitor@example.com").unwrap();
        assert!(!principal.can_moderate());
    }

    #[test]
    fn test_admin_without_identity_cannot_moderate() {
        assert!(!Principal::admin("").can_moderate());
        assert!(!Principal::member("someone").can_moderate());
    }
}
