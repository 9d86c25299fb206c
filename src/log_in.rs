//! The log-in page and the route handling log-in requests. The auth module
//! handles the lower level cookie logic.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::set_auth_cookie,
    endpoints,
    html::{base, error_message_view},
    user::get_user_by_username,
};

pub(crate) const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";

fn log_in_form(username: &str, error_message: Option<&str>) -> Markup {
    html! {
        form class="stacked" method="post" action=(endpoints::LOG_IN) {
            div {
                label for="username" { "Username" }
                input id="username" type="text" name="username" value=(username) required autofocus;
            }
            div {
                label for="password" { "Password" }
                input id="password" type="password" name="password" required;
            }

            (error_message_view(error_message))

            button type="submit" { "Log in" }

            p class="muted" {
                "No account yet? "
                a href=(endpoints::REGISTER) { "Register here" }
            }
        }
    }
}

fn log_in_view(username: &str, error_message: Option<&str>) -> Markup {
    let content = html! {
        h1 { "Log in" }
        (log_in_form(username, error_message))
    };

    base("Log in", &content)
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    log_in_view("", None).into_response()
}

/// The raw data entered by the user in the log-in form.
///
/// The username and password are stored as plain strings. There is no need
/// for validation here since they will be compared against the stored user
/// record.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    pub username: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in the auth cookie is set and the client is redirected
/// to the dashboard page. Otherwise, the form is returned with an error
/// message explaining the problem.
pub async fn post_log_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let username = user_data.username.trim();

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_username(username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                return log_in_view(username, Some(INVALID_CREDENTIALS_ERROR_MSG))
                    .into_response();
            }
            Err(error) => {
                tracing::error!("unhandled error while looking up user: {error}");
                return error.into_response();
            }
        }
    };

    let is_password_valid = match user.password_hash.verify(&user_data.password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_response();
        }
    };

    if !is_password_valid {
        return log_in_view(username, Some(INVALID_CREDENTIALS_ERROR_MSG)).into_response();
    }

    let updated_jar = set_auth_cookie(jar, user.id, state.cookie_duration);

    (updated_jar, Redirect::to(endpoints::DASHBOARD)).into_response()
}
