// Core auth module - principals, roles and the resolver port.

pub mod auth_models;
pub mod principal_resolver;

pub use auth_models::*;
pub use principal_resolver::PrincipalResolver;
