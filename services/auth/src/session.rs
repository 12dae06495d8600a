//! Session credential handling
//!
//! The session token travels in an HTTP-only `auth-token` cookie. This
//! module owns the cookie's name, lifetime and attributes.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;

use crate::jwt::{JwtService, SESSION_TTL_SECS, SessionIdentity, TokenError};

/// Name of the session cookie
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// Writes, reads and clears the session cookie
#[derive(Clone)]
pub struct SessionCookies {
    jwt_service: JwtService,
    /// Set the `Secure` attribute (production deployments)
    secure: bool,
}

impl SessionCookies {
    pub fn new(jwt_service: JwtService, secure: bool) -> Self {
        Self {
            jwt_service,
            secure,
        }
    }

    /// Issue a token for `identity` and add it to the jar
    pub fn attach(
        &self,
        jar: CookieJar,
        identity: &SessionIdentity,
    ) -> Result<CookieJar, TokenError> {
        let token = self.jwt_service.issue(identity)?;

        let cookie = Cookie::build((AUTH_COOKIE_NAME, token))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(SESSION_TTL_SECS as i64))
            .path("/");

        Ok(jar.add(cookie))
    }

    /// Extract the raw session token; `None` means unauthenticated
    pub fn read(jar: &CookieJar) -> Option<String> {
        jar.get(AUTH_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Remove the session cookie. Safe to call when no cookie is present.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(AUTH_COOKIE_NAME).path("/"))
    }
}
