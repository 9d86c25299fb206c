//! Coinpurse is a small self-hosted web app for tracking personal finances.
//!
//! Each user owns a single money account addressed by a derived account
//! number. Users record income and expense operations against spending
//! categories that carry limits, and move money to other users by account
//! number. This library provides the ledger engine that enforces the money
//! invariants, the SQLite persistence layer, and the HTTP routes that serve
//! the HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod categories_page;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod ledger;
mod log_in;
mod log_out;
mod navigation;
mod not_found;
mod operation;
mod operations_page;
mod password;
mod query;
mod register_user;
mod routing;
mod user;

pub use account::{Account, AccountNumber};
pub use app_state::AppState;
pub use category::{Category, CategoryLimit, CategoryName};
pub use database_id::DatabaseID;
pub use db::initialize;
pub use ledger::{Ledger, Transfer};
pub use operation::{Operation, OperationKind};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID, get_user_by_username, update_user_password};

use crate::{
    internal_server_error::render_internal_server_error, not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An operation or transfer was attempted with a zero or negative amount.
    #[error("{0} is not a valid amount, the amount must be greater than zero")]
    InvalidAmount(f64),

    /// An expense or transfer was attempted for more money than the account
    /// holds.
    #[error("the account balance is too low for this operation")]
    InsufficientFunds,

    /// An expense would push the cumulative spend in a category past its
    /// limit.
    #[error("the category spending limit would be exceeded, {remaining} remaining")]
    LimitExceeded {
        /// The amount that can still be spent in the category. May be
        /// negative if the limit was lowered below the amount already spent.
        remaining: f64,
    },

    /// An empty string was used as a category name.
    #[error("a category name cannot be empty")]
    InvalidCategoryName,

    /// A negative or non-finite number was used as a category spending limit.
    #[error("{0} is not a valid spending limit, the limit must be zero or more")]
    InvalidLimit(f64),

    /// The user already has a category with the given name.
    #[error("a category with this name already exists")]
    DuplicateCategoryName,

    /// The username is already taken by another user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// No account matches the account number given for a transfer.
    #[error("no account was found with the given account number")]
    RecipientNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The user provided an invalid username or password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    ///
    /// Kept distinct from [Error::NotFound] so that storage failures are
    /// never mistaken for missing rows.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 787 occurs when a FOREIGN KEY constraint failed, i.e. a
            // query referred to a row that does not exist.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 787 =>
            {
                Error::NotFound
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("category.name") =>
            {
                Error::DuplicateCategoryName
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error()
            }
        }
    }
}
