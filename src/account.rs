//! Defines the money account and the database functions for managing
//! accounts. Every user owns exactly one account, created at registration
//! with a balance of zero. Accounts are addressed externally by a derived
//! twelve-digit account number, which is what transfer recipients share.
//!
//! Only the [ledger](crate::Ledger) may change an account's balance.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DatabaseID, Error, user::UserID};

/// The number of decimal digits in an account number.
const ACCOUNT_NUMBER_DIGITS: u32 = 12;

/// A twelve-digit number that addresses an account for transfers.
///
/// The number is derived deterministically from the owning user's ID, so the
/// same user always receives the same number. Uniqueness is enforced by the
/// database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(i64);

impl AccountNumber {
    /// Derive the account number for the user with `user_id`.
    pub fn derive_for(user_id: UserID) -> Self {
        let digest = Sha256::digest(user_id.as_i64().to_le_bytes());
        let bytes: [u8; 8] = digest[..8]
            .try_into()
            .expect("a SHA-256 digest is at least 8 bytes");
        let number = u64::from_le_bytes(bytes) % 10u64.pow(ACCOUNT_NUMBER_DIGITS);

        Self(number as i64)
    }

    /// Wrap a raw number, e.g. one entered into the transfer form.
    pub fn new(number: i64) -> Self {
        Self(number)
    }

    /// The underlying integer value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:012}", self.0)
    }
}

/// The single money account owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: DatabaseID,
    /// The ID of the owning user.
    pub user_id: UserID,
    /// The number that addresses this account for transfers.
    pub number: AccountNumber,
    /// The amount of money in the account.
    pub balance: f64,
}

/// Create an account for the user with `user_id` with a balance of zero.
///
/// # Errors
/// Returns an [Error::NotFound] if `user_id` does not refer to a valid user,
/// or an [Error::SqlError] if there is some other SQL error.
pub fn create_account(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    let number = AccountNumber::derive_for(user_id);

    connection.execute(
        "INSERT INTO account (user_id, number, balance) VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), number.as_i64(), 0.0),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Account {
        id,
        user_id,
        number,
        balance: 0.0,
    })
}

/// Get the account that has the specified `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no account with `id`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: DatabaseID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, number, balance FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Get the account owned by the user with `user_id`.
///
/// # Errors
/// Returns an [Error::NotFound] if the user has no account, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_account_by_user(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, number, balance FROM account WHERE user_id = :user_id")?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the account addressed by `number`.
///
/// # Errors
/// Returns an [Error::NotFound] if no account has `number`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_account_by_number(
    number: AccountNumber,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, number, balance FROM account WHERE number = :number")?
        .query_row(&[(":number", &number.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Add `delta` (which may be negative) to the balance of the account with
/// `account_id`.
///
/// The update is relative so that two changes to the same account within one
/// SQL transaction compose instead of overwriting each other, e.g. the two
/// legs of a self-transfer.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no account with `account_id`, or
/// an [Error::SqlError] if there is some other SQL error.
pub(crate) fn apply_to_balance(
    account_id: DatabaseID,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = balance + ?1 WHERE id = ?2",
        (delta, account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub(crate) fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE,
            number INTEGER NOT NULL UNIQUE,
            balance REAL NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_user_id = row.get(1)?;
    let raw_number = row.get(2)?;
    let balance = row.get(3)?;

    Ok(Account {
        id,
        user_id: UserID::new(raw_user_id),
        number: AccountNumber::new(raw_number),
        balance,
    })
}
