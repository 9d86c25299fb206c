//! The registration page and the route for creating a new user.
//!
//! Registering creates both the user and their single money account, which
//! starts with a balance of zero and is addressed by a number derived from
//! the user's ID.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::create_account,
    endpoints,
    html::{base, error_message_view},
    password::{PasswordHash, ValidatedPassword},
    user::create_user,
};

fn registration_form(username: &str, error_message: Option<&str>) -> Markup {
    html! {
        form class="stacked" method="post" action=(endpoints::USERS) {
            div {
                label for="username" { "Username" }
                input id="username" type="text" name="username" value=(username) required autofocus;
            }
            div {
                label for="password" { "Password" }
                input id="password" type="password" name="password" required;
            }
            div {
                label for="confirm-password" { "Confirm Password" }
                input id="confirm-password" type="password" name="confirm_password" required;
            }

            (error_message_view(error_message))

            button type="submit" { "Register" }

            p class="muted" {
                "Already have an account? "
                a href=(endpoints::LOG_IN) { "Log in here" }
            }
        }
    }
}

fn registration_view(username: &str, error_message: Option<&str>) -> Markup {
    let content = html! {
        h1 { "Create an account" }
        (registration_form(username, error_message))
    };

    base("Register", &content)
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    registration_view("", None).into_response()
}

/// The raw data entered by the user in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    /// The name the new user will log in with.
    pub username: String,
    /// The password entered during registration.
    pub password: String,
    /// The password, entered a second time to catch typos.
    pub confirm_password: String,
}

/// A route handler for registering a new user.
///
/// On success the user and their account are created together and the client
/// is redirected to the log-in page. Otherwise the form is returned with an
/// error message explaining the problem.
pub async fn register_user(
    State(state): State<AppState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let username = user_data.username.trim();

    if username.is_empty() {
        return registration_view("", Some("Enter a username.")).into_response();
    }

    if user_data.password != user_data.confirm_password {
        return registration_view(username, Some("Passwords do not match.")).into_response();
    }

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            return registration_view(username, Some(&error.to_string())).into_response();
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => {
            tracing::error!("could not hash password: {error}");
            return error.into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    // The user and their account must appear together or not at all.
    let result = (|| -> Result<(), Error> {
        let transaction = connection.unchecked_transaction()?;
        let user = create_user(username, password_hash, &transaction)?;
        create_account(user.id, &transaction)?;
        transaction.commit()?;

        Ok(())
    })();

    match result {
        Ok(()) => Redirect::to(endpoints::LOG_IN).into_response(),
        Err(Error::DuplicateUsername) => {
            registration_view(username, Some("The username is already taken.")).into_response()
        }
        Err(error) => {
            tracing::error!("could not register user: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        AppState,
        account::get_account_by_user,
        build_router,
        db::initialize,
        endpoints,
        user::get_user_by_username,
    };

    use super::RegisterForm;

    fn get_test_server() -> (TestServer, AppState) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");

        let state = AppState::new("42", Arc::new(Mutex::new(connection)));
        let server = TestServer::try_new(build_router(state.clone()))
            .expect("Could not create test server");

        (server, state)
    }

    #[tokio::test]
    async fn register_page_displays_form() {
        let (server, _) = get_test_server();

        let response = server.get(endpoints::REGISTER).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        let username_input = Selector::parse("input[name=username]").unwrap();
        let password_input = Selector::parse("input[name=password]").unwrap();
        assert_eq!(document.select(&username_input).count(), 1);
        assert_eq!(document.select(&password_input).count(), 1);
    }

    #[tokio::test]
    async fn register_creates_user_and_account() {
        let (server, state) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "alice".to_string(),
                password: "averylongandsecurepassword".to_string(),
                confirm_password: "averylongandsecurepassword".to_string(),
            })
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN);

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_username("alice", &connection).expect("User was not created");
        let account =
            get_account_by_user(user.id, &connection).expect("Account was not created");
        assert_eq!(account.balance, 0.0);
    }

    #[tokio::test]
    async fn register_fails_on_blank_username() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "   ".to_string(),
                password: "averylongandsecurepassword".to_string(),
                confirm_password: "averylongandsecurepassword".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Enter a username."));
    }

    #[tokio::test]
    async fn register_fails_on_mismatched_passwords() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "alice".to_string(),
                password: "averylongandsecurepassword".to_string(),
                confirm_password: "adifferentlongpassword".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Passwords do not match."));
    }

    #[tokio::test]
    async fn register_fails_on_weak_password() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "alice".to_string(),
                password: "hunter2".to_string(),
                confirm_password: "hunter2".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("password is too weak"));
    }

    #[tokio::test]
    async fn register_fails_on_duplicate_username() {
        let (server, _) = get_test_server();
        let form = RegisterForm {
            username: "alice".to_string(),
            password: "averylongandsecurepassword".to_string(),
            confirm_password: "averylongandsecurepassword".to_string(),
        };

        server.post(endpoints::USERS).form(&form).await;

        let response = server.post(endpoints::USERS).form(&form).await;

        response.assert_status_ok();
        assert!(response.text().contains("The username is already taken."));
    }
}
