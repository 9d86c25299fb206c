//! Cookie auth: setting and reading the session cookie, and the middleware
//! that protects the app's pages.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, endpoints, user::UserID};

pub(crate) const COOKIE_USER_ID: &str = "user_id";

/// The default duration for which auth cookies are valid.
pub(crate) const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Add an auth cookie to the cookie jar, indicating that a user is logged in
/// and authenticated.
///
/// Returns the cookie jar with the cookie added.
pub(crate) fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_USER_ID, user_id.as_i64().to_string()))
            .expires(OffsetDateTime::now_utc() + duration)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Set the auth cookie to an invalid value and set its max age to zero, which
/// deletes the cookie on the client side.
pub(crate) fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_USER_ID, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Read the logged-in user's ID from the auth cookie.
///
/// # Errors
/// Returns an [Error::InvalidCredentials] if the cookie is missing or does
/// not hold a user ID.
pub(crate) fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    match jar.get(COOKIE_USER_ID) {
        Some(user_id_cookie) => user_id_cookie
            .value_trimmed()
            .parse()
            .map(UserID::new)
            .map_err(|_| Error::InvalidCredentials),
        None => Err(Error::InvalidCredentials),
    }
}

/// Middleware function that checks for a valid authorization cookie.
///
/// If the cookie is valid, the user ID is placed into the request and the
/// request executed normally, otherwise a redirect to the log-in page is
/// returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserID>` to receive the user ID.
pub(crate) async fn auth_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(&mut parts, &state)
        .await
        .expect("could not get cookie jar from request parts");

    match get_user_id_from_auth_cookie(&jar) {
        Ok(user_id) => {
            parts.extensions.insert(user_id);
            let request = Request::from_parts(parts, body);

            next.run(request).await
        }
        Err(_) => Redirect::to(endpoints::LOG_IN).into_response(),
    }
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::PrivateCookieJar;
    use time::{Duration, OffsetDateTime};

    use crate::{app_state::create_cookie_key, user::UserID};

    use super::{
        COOKIE_USER_ID, get_user_id_from_auth_cookie, invalidate_auth_cookie, set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(create_cookie_key("foobar"))
    }

    #[test]
    fn set_cookie_stores_user_id() {
        let user_id = UserID::new(1);

        let jar = set_auth_cookie(get_jar(), user_id, Duration::minutes(5));

        assert_eq!(get_user_id_from_auth_cookie(&jar), Ok(user_id));
    }

    #[test]
    fn set_cookie_sets_expiry() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::minutes(5));

        let expiry = jar
            .get(COOKIE_USER_ID)
            .unwrap()
            .expires_datetime()
            .unwrap();

        assert!(expiry > OffsetDateTime::now_utc());
    }

    #[test]
    fn invalidated_cookie_does_not_yield_user_id() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::minutes(5));

        let jar = invalidate_auth_cookie(jar);

        assert!(get_user_id_from_auth_cookie(&jar).is_err());
    }

    #[test]
    fn missing_cookie_does_not_yield_user_id() {
        assert!(get_user_id_from_auth_cookie(&get_jar()).is_err());
    }
}
