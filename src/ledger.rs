//! The ledger engine: the single authority that may change an account's
//! balance or record an operation.
//!
//! Every mutation acquires the shared connection lock and runs inside one SQL
//! transaction, so the check-then-write sequences (balance sufficiency,
//! category limits, the two legs of a transfer) are atomic and serialized.
//! Partial application is never observable: if any write fails, the
//! transaction is rolled back when it is dropped.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    DatabaseID, Error,
    account::{AccountNumber, apply_to_balance, get_account, get_account_by_number},
    category::{
        CategoryLimit, CategoryName, TRANSFER_CATEGORY_NAME, create_category, get_category,
        get_category_by_name,
    },
    operation::{Operation, OperationKind, insert_operation},
    user::UserID,
};

/// The two operations produced by a successful transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// The expense operation recorded against the sender's account.
    pub outgoing: Operation,
    /// The income operation recorded against the recipient's account.
    pub incoming: Operation,
}

/// Validates and applies operations and transfers against accounts.
///
/// The ledger holds the shared database handle injected by the composition
/// root. All other code may read accounts and operations, but only the
/// ledger writes them.
#[derive(Debug, Clone)]
pub struct Ledger {
    db_connection: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Create a ledger over the shared database connection.
    pub fn new(db_connection: Arc<Mutex<Connection>>) -> Self {
        Self { db_connection }
    }

    /// Record a single income or expense operation against the account with
    /// `account_id` and apply it to the account's balance.
    ///
    /// # Errors
    /// Returns an:
    /// - [Error::InvalidAmount] if `amount` is zero or negative,
    /// - [Error::NotFound] if the account or category do not exist,
    /// - [Error::InsufficientFunds] if an expense exceeds the balance,
    /// - [Error::LimitExceeded] if an expense would push the category's
    ///   cumulative spend past its limit,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - [Error::SqlError] if there is some other SQL error.
    pub fn record_operation(
        &self,
        account_id: DatabaseID,
        kind: OperationKind,
        amount: f64,
        category_id: Option<DatabaseID>,
    ) -> Result<Operation, Error> {
        if amount <= 0.0 {
            return Err(Error::InvalidAmount(amount));
        }

        let connection = self
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;
        let transaction = connection.unchecked_transaction()?;

        let account = get_account(account_id, &transaction)?;

        if kind == OperationKind::Expense {
            if amount > account.balance {
                return Err(Error::InsufficientFunds);
            }

            // The reserved Transfer category passes this check by virtue of
            // its unlimited sentinel limit.
            if let Some(category_id) = category_id {
                let category = get_category(category_id, &transaction)?;
                let spent = spent_in_category(account_id, category_id, &transaction)?;
                let remaining = category.limit.remaining(spent);

                if amount > remaining {
                    return Err(Error::LimitExceeded { remaining });
                }
            }
        }

        let date = now_to_the_minute();
        let operation =
            insert_operation(account_id, category_id, kind, amount, date, &transaction)?;

        let delta = match kind {
            OperationKind::Income => amount,
            OperationKind::Expense => -amount,
        };
        apply_to_balance(account_id, delta, &transaction)?;

        transaction.commit()?;

        tracing::debug!(
            "recorded {} of {} against account {}",
            kind.as_str(),
            amount,
            account_id
        );

        Ok(operation)
    }

    /// Move `amount` from the account with `sender_account_id` to the account
    /// addressed by `recipient_number`.
    ///
    /// Produces exactly two operations sharing one timestamp: an expense on
    /// the sender and an income on the recipient, both recorded under the
    /// sender's reserved "Transfer" category, which is created on first use.
    ///
    /// A transfer to the sender's own account number is permitted and nets to
    /// a zero balance change, recorded as the usual two operations.
    ///
    /// # Errors
    /// Returns an:
    /// - [Error::RecipientNotFound] if no account has `recipient_number`,
    /// - [Error::InvalidAmount] if `amount` is zero or negative,
    /// - [Error::NotFound] if the sender's account does not exist,
    /// - [Error::InsufficientFunds] if `amount` exceeds the sender's balance,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - [Error::SqlError] if there is some other SQL error.
    pub fn transfer(
        &self,
        sender_account_id: DatabaseID,
        recipient_number: AccountNumber,
        amount: f64,
    ) -> Result<Transfer, Error> {
        let connection = self
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;
        let transaction = connection.unchecked_transaction()?;

        let recipient = match get_account_by_number(recipient_number, &transaction) {
            Ok(account) => account,
            Err(Error::NotFound) => return Err(Error::RecipientNotFound),
            Err(error) => return Err(error),
        };

        if amount <= 0.0 {
            return Err(Error::InvalidAmount(amount));
        }

        let sender = get_account(sender_account_id, &transaction)?;

        if amount > sender.balance {
            return Err(Error::InsufficientFunds);
        }

        let category_id = get_or_create_transfer_category(sender.user_id, &transaction)?;
        let date = now_to_the_minute();

        let outgoing = insert_operation(
            sender.id,
            Some(category_id),
            OperationKind::Expense,
            amount,
            date,
            &transaction,
        )?;
        let incoming = insert_operation(
            recipient.id,
            Some(category_id),
            OperationKind::Income,
            amount,
            date,
            &transaction,
        )?;

        apply_to_balance(sender.id, -amount, &transaction)?;
        apply_to_balance(recipient.id, amount, &transaction)?;

        transaction.commit()?;

        tracing::debug!(
            "transferred {} from account {} to account {}",
            amount,
            sender.id,
            recipient.id
        );

        Ok(Transfer { outgoing, incoming })
    }
}

/// The total amount spent in the category with `category_id` by expense
/// operations on the account with `account_id`.
///
/// Recomputed from the persisted operations on every call, so it can never go
/// stale. Returns zero if no expense operation matches.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn spent_in_category(
    account_id: DatabaseID,
    category_id: DatabaseID,
    connection: &Connection,
) -> Result<f64, Error> {
    let spent = connection
        .prepare(
            "SELECT COALESCE(SUM(amount), 0) FROM operation
             WHERE account_id = ?1 AND category_id = ?2 AND kind = ?3",
        )?
        .query_row(
            (account_id, category_id, OperationKind::Expense),
            |row| row.get(0),
        )?;

    Ok(spent)
}

/// Look up the reserved "Transfer" category for the user with `user_id`,
/// creating it with the unlimited sentinel limit if it does not exist yet.
fn get_or_create_transfer_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<DatabaseID, Error> {
    let name = CategoryName::new_unchecked(TRANSFER_CATEGORY_NAME);

    match get_category_by_name(user_id, &name, connection) {
        Ok(category) => Ok(category.id),
        Err(Error::NotFound) => {
            create_category(user_id, name, CategoryLimit::UNLIMITED, connection)
                .map(|category| category.id)
        }
        Err(error) => Err(error),
    }
}

/// The current UTC time truncated to minute precision. Both legs of a
/// transfer share one value produced by this function.
fn now_to_the_minute() -> OffsetDateTime {
    OffsetDateTime::now_utc()
        .replace_second(0)
        .expect("zero is a valid second")
        .replace_nanosecond(0)
        .expect("zero is a valid nanosecond")
}
