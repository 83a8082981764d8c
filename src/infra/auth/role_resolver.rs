use crate::core::auth::{Principal, PrincipalResolver, RequestContext, RolePolicy};
use async_trait::async_trait;

/// Trusts the subject an upstream session layer put on the request and maps
/// it to a role through the configured policy.
pub struct RolePrincipalResolver {
    policy: RolePolicy,
}

impl RolePrincipalResolver {
    pub fn new(policy: RolePolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl PrincipalResolver for RolePrincipalResolver {
    async fn current_principal(&self, request: &RequestContext) -> Option<Principal> {
        request
            .subject
            .as_deref()
            .and_then(|subject| self.policy.principal_for(subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subject_is_mapped_through_policy() {
        let resolver = RolePrincipalResolver::new(RolePolicy::from_csv("owner@example.com"));

        let admin = resolver
            .current_principal(&RequestContext::with_subject("Owner@Example.com"))
            .await
            .unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.identity, "Owner@Example.com");

        let visitor = resolver
            .current_principal(&RequestContext::with_subject("visitor@example.com"))
            .await
            .unwrap();
        assert!(!visitor.is_admin);

        assert!(resolver
            .current_principal(&RequestContext::anonymous())
            .await
            .is_none());
    }
}
