//! Middleware gating routes on an authenticated session

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

use crate::{error::AuthError, identity::IdentityResolver};

/// Reject the request with 401 unless the session cookie resolves to a user
///
/// The resolved [`crate::models::User`] is inserted into the request
/// extensions for handlers to pick up with `Extension<User>`.
pub async fn require_user(
    State(identity): State<IdentityResolver>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = identity.require_user(&jar).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
