//! Sets up the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, category::create_category_table,
    operation::create_operation_table, user::create_user_table,
};

/// Create the tables for the application's domain models.
///
/// Foreign keys are switched on for `connection` so that rows cannot refer to
/// rows that do not exist.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_operation_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
