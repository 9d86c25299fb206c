//! Implements the struct that holds the state of the HTTP server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{auth::DEFAULT_COOKIE_DURATION, ledger::Ledger};

/// The state of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The shared database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The ledger engine that applies operations and transfers.
    pub ledger: Ledger,
}

impl AppState {
    /// Create a new [AppState].
    ///
    /// `cookie_secret` seeds the key used to sign and encrypt auth cookies.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: db_connection.clone(),
            ledger: Ledger::new(db_connection),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub(crate) fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

#[cfg(test)]
mod cookie_key_tests {
    use super::create_cookie_key;

    #[test]
    fn same_secret_produces_same_key() {
        assert_eq!(
            create_cookie_key("foobar").master(),
            create_cookie_key("foobar").master()
        );
    }

    #[test]
    fn different_secrets_produce_different_keys() {
        assert_ne!(
            create_cookie_key("foobar").master(),
            create_cookie_key("raboof").master()
        );
    }
}
