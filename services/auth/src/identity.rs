//! Resolution of the session cookie into a live user record
//!
//! Claims only identify the user; every resolution re-reads the record so
//! fields like `upload_count` are current.

use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    error::AuthError, jwt::JwtService, models::User, repositories::UserStore,
    session::SessionCookies,
};

#[derive(Clone)]
pub struct IdentityResolver {
    jwt_service: JwtService,
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(jwt_service: JwtService, users: Arc<dyn UserStore>) -> Self {
        Self { jwt_service, users }
    }

    /// The signed-in user, or `None` for any failure
    pub async fn current_user(&self, jar: &CookieJar) -> Option<User> {
        match self.resolve(jar).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Failed to load user for session");
                None
            }
        }
    }

    /// The signed-in user, or `Unauthenticated`
    ///
    /// A user store failure is reported as `Internal` rather than being
    /// mistaken for a missing session.
    pub async fn require_user(&self, jar: &CookieJar) -> Result<User, AuthError> {
        match self.resolve(jar).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthError::Unauthenticated),
            Err(e) => {
                error!(error = %e, "Failed to load user for session");
                Err(AuthError::Internal)
            }
        }
    }

    async fn resolve(&self, jar: &CookieJar) -> anyhow::Result<Option<User>> {
        let Some(token) = SessionCookies::read(jar) else {
            return Ok(None);
        };

        let claims = match self.jwt_service.verify(&token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return Ok(None);
            }
        };

        let user = self.users.find_by_id(claims.user_id).await?;
        if user.is_none() {
            debug!(user_id = %claims.user_id, "Session refers to a missing user");
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{JwtConfig, SESSION_TTL_SECS, SessionIdentity};
    use crate::testing::InMemoryUserStore;
    use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

    fn jar_with_token(token: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("auth-token={}", token)).unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    fn setup() -> (JwtService, Arc<InMemoryUserStore>, IdentityResolver) {
        let jwt = JwtService::new(&JwtConfig::new("identity-secret").unwrap());
        let users = Arc::new(InMemoryUserStore::new());
        let resolver = IdentityResolver::new(jwt.clone(), users.clone());
        (jwt, users, resolver)
    }

    #[tokio::test]
    async fn test_valid_session_resolves_live_record() {
        let (jwt, users, resolver) = setup();
        let user = users.insert_user("ada", 0);
        let token = jwt.issue(&SessionIdentity::from(&user)).unwrap();

        // Changes after sign-in are visible through the same token
        users.set_upload_count(user.id, 3);

        let resolved = resolver.require_user(&jar_with_token(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.upload_count, 3);
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthenticated() {
        let (_, _, resolver) = setup();

        assert!(resolver.current_user(&CookieJar::new()).await.is_none());
        assert!(matches!(
            resolver.require_user(&CookieJar::new()).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_invalid_or_expired_token_is_unauthenticated() {
        let (jwt, users, resolver) = setup();
        let user = users.insert_user("ada", 0);
        let expired = jwt
            .issue_at(&SessionIdentity::from(&user), 1_000_000 - SESSION_TTL_SECS)
            .unwrap();

        for token in ["garbage", expired.as_str()] {
            let jar = jar_with_token(token);
            assert!(resolver.current_user(&jar).await.is_none());
            assert!(matches!(
                resolver.require_user(&jar).await,
                Err(AuthError::Unauthenticated)
            ));
        }
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_unauthenticated() {
        let (jwt, users, resolver) = setup();
        let user = users.insert_user("ada", 0);
        let token = jwt.issue(&SessionIdentity::from(&user)).unwrap();
        users.remove(user.id);

        assert!(matches!(
            resolver.require_user(&jar_with_token(&token)).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_for_require_and_none_for_current() {
        let (jwt, users, resolver) = setup();
        let user = users.insert_user("ada", 0);
        let token = jwt.issue(&SessionIdentity::from(&user)).unwrap();
        users.fail_lookups(true);

        let jar = jar_with_token(&token);
        assert!(resolver.current_user(&jar).await.is_none());
        assert!(matches!(
            resolver.require_user(&jar).await,
            Err(AuthError::Internal)
        ));
    }
}
