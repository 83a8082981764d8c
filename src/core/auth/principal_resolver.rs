use super::auth_models::{Principal, RequestContext};
use async_trait::async_trait;

/// The auth collaborator: turns request credentials into a principal.
///
/// Returning `None` means "not authenticated". The core never sees passwords
/// or sessions, only the resolved principal.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn current_principal(&self, request: &RequestContext) -> Option<Principal>;
}

#[async_trait]
impl<T: PrincipalResolver + ?Sized> PrincipalResolver for Box<T> {
    async fn current_principal(&self, request: &RequestContext) -> Option<Principal> {
        (**self).current_principal(request).await
    }
}
