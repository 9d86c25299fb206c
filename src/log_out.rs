//! The route for logging out the current user.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use crate::{auth::invalidate_auth_cookie, endpoints};

/// Invalidate the auth cookie and redirect the client to the log-in page.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let updated_jar = invalidate_auth_cookie(jar);

    (updated_jar, Redirect::to(endpoints::LOG_IN)).into_response()
}
