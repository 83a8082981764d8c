// Bearer-token principal resolver.
//
// Verifies an HS256 token issued by the site's login flow, takes its `sub`
// claim as the identity and maps it to a role through the RolePolicy.

use crate::core::auth::{Principal, PrincipalResolver, RequestContext, RolePolicy};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims we read from moderator tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModeratorClaims {
    pub sub: String,
    pub exp: usize,
}

pub struct JwtPrincipalResolver {
    key: DecodingKey,
    validation: Validation,
    policy: RolePolicy,
}

impl JwtPrincipalResolver {
    pub fn new(secret: &[u8], policy: RolePolicy) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            policy,
        }
    }
}

#[async_trait]
impl PrincipalResolver for JwtPrincipalResolver {
    async fn current_principal(&self, request: &RequestContext) -> Option<Principal> {
        let raw = request.bearer_token.as_deref()?.trim();
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

        match decode::<ModeratorClaims>(token, &self.key, &self.validation) {
            Ok(data) => self.policy.principal_for(&data.claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn token(sub: &str, expires_in: Duration, secret: &[u8]) -> String {
        let claims = ModeratorClaims {
            sub: sub.to_string(),
            exp: (Utc::now() + expires_in).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn resolver() -> JwtPrincipalResolver {
        JwtPrincipalResolver::new(SECRET, RolePolicy::from_admins(["owner@example.com"]))
    }

    #[tokio::test]
    async fn test_valid_token_resolves_admin() {
        let bearer = format!(
            "Bearer {}",
            token("owner@example.com", Duration::hours(1), SECRET)
        );

        let principal = resolver()
            .current_principal(&RequestContext::with_bearer_token(bearer))
            .await
            .unwrap();
        assert!(principal.is_admin);
        assert_eq!(principal.identity, "owner@example.com");
    }

    #[tokio::test]
    async fn test_bad_tokens_resolve_to_nobody() {
        let resolver = resolver();

        let forged = token("owner@example.com", Duration::hours(1), b"wrong-secret");
        let expired = token("owner@example.com", -Duration::hours(2), SECRET);

        for bad in [forged, expired, "not-a-jwt".to_string()] {
            assert!(resolver
                .current_principal(&RequestContext::with_bearer_token(bad))
                .await
                .is_none());
        }
        assert!(resolver
            .current_principal(&RequestContext::anonymous())
            .await
            .is_none());
    }
}
