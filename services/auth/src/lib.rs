//! Authentication for the media sharing backend
//!
//! Stateless HS256 session tokens carried in an HTTP-only cookie, resolved
//! on every request into the live user record.

pub mod error;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

pub use error::AuthError;
pub use identity::IdentityResolver;
pub use jwt::{JwtConfig, JwtService};
pub use models::{User, UserSummary};
pub use repositories::{PgUserStore, UserStore};
pub use session::SessionCookies;

/// State shared by the account routes
#[derive(Clone)]
pub struct AuthState {
    pub identity: IdentityResolver,
    pub sessions: SessionCookies,
    pub users: Arc<dyn UserStore>,
}
