// Implementations of the PrincipalResolver port.

pub mod jwt_resolver;
pub mod role_resolver;

pub use jwt_resolver::JwtPrincipalResolver;
pub use role_resolver::RolePrincipalResolver;
