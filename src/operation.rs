//! Defines the operation, the immutable record of money moving into or out
//! of an account, and the database functions for reading operations back.
//!
//! Operations are only ever created by the [ledger](crate::Ledger), which is
//! the single authority allowed to move money.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{DatabaseID, Error};

/// Whether an operation brings money into an account or takes money out of
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Money coming into the account.
    Income,
    /// Money leaving the account.
    Expense,
}

impl OperationKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Income => "income",
            OperationKind::Expense => "expense",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Income => write!(f, "Income"),
            OperationKind::Expense => write!(f, "Expense"),
        }
    }
}

impl ToSql for OperationKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for OperationKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(OperationKind::Income),
            "expense" => Ok(OperationKind::Expense),
            other => Err(FromSqlError::Other(
                format!("{other} is not a valid operation kind").into(),
            )),
        }
    }
}

/// An immutable, timestamped record of money moving into or out of an
/// account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The ID of the operation.
    pub id: DatabaseID,
    /// The ID of the account the operation was recorded against.
    pub account_id: DatabaseID,
    /// The category the operation was recorded under, if any.
    ///
    /// The ID may refer to a category that has since been deleted; such
    /// operations display as uncategorized.
    pub category_id: Option<DatabaseID>,
    /// Whether the operation is an income or an expense.
    pub kind: OperationKind,
    /// The amount of money moved. Always greater than zero.
    pub amount: f64,
    /// When the operation was recorded, to minute precision. The two legs of
    /// a transfer carry an identical timestamp.
    pub date: OffsetDateTime,
}

/// Insert an operation into the database.
///
/// Only the [ledger](crate::Ledger) may record operations; it validates the
/// amount and applies the matching balance change within the same SQL
/// transaction.
///
/// # Errors
/// Returns an [Error::NotFound] if `account_id` or `category_id` do not refer
/// to valid rows, or an [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_operation(
    account_id: DatabaseID,
    category_id: Option<DatabaseID>,
    kind: OperationKind,
    amount: f64,
    date: OffsetDateTime,
    connection: &Connection,
) -> Result<Operation, Error> {
    let operation = connection
        .prepare(
            "INSERT INTO operation (account_id, category_id, kind, amount, date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, account_id, category_id, kind, amount, date",
        )?
        .query_row((account_id, category_id, kind, amount, date), map_row)
        .map_err(Error::from)?;

    Ok(operation)
}

/// Get the operation that has the specified `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no operation with `id`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_operation(id: DatabaseID, connection: &Connection) -> Result<Operation, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, kind, amount, date
             FROM operation WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Get all operations recorded against the account with `account_id`, in the
/// order they were recorded.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_operations_by_account(
    account_id: DatabaseID,
    connection: &Connection,
) -> Result<Vec<Operation>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, kind, amount, date
             FROM operation WHERE account_id = :account_id ORDER BY id ASC",
        )?
        .query_map(&[(":account_id", &account_id)], map_row)?
        .map(|maybe_operation| maybe_operation.map_err(|error| error.into()))
        .collect()
}

pub(crate) fn create_operation_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS operation (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            category_id INTEGER,
            kind TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Operation, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let category_id = row.get(2)?;
    let kind = row.get(3)?;
    let amount = row.get(4)?;
    let date = row.get(5)?;

    Ok(Operation {
        id,
        account_id,
        category_id,
        kind,
        amount,
        date,
    })
}

#[cfg(test)]
mod operation_kind_tests {
    use rusqlite::Connection;

    use super::OperationKind;

    #[test]
    fn kind_round_trips_through_sql() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE kind_test (kind TEXT NOT NULL)", ())
            .unwrap();

        for kind in [OperationKind::Income, OperationKind::Expense] {
            connection
                .execute("INSERT INTO kind_test (kind) VALUES (?1)", (kind,))
                .unwrap();
        }

        let kinds: Vec<OperationKind> = connection
            .prepare("SELECT kind FROM kind_test")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(kinds, vec![OperationKind::Income, OperationKind::Expense]);
    }

    #[test]
    fn invalid_kind_string_fails_to_convert() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE kind_test (kind TEXT NOT NULL)", ())
            .unwrap();
        connection
            .execute("INSERT INTO kind_test (kind) VALUES ('sideways')", ())
            .unwrap();

        let result: Result<OperationKind, _> =
            connection.query_row("SELECT kind FROM kind_test", [], |row| row.get(0));

        assert!(result.is_err());
    }
}

#[cfg(test)]
mod operation_query_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        account::create_account,
        category::{CategoryLimit, CategoryName, create_category},
        db::initialize,
        password::PasswordHash,
        user::create_user,
    };

    use super::{
        OperationKind, get_operation, get_operations_by_account, insert_operation,
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_account(connection: &Connection) -> i64 {
        let user = create_user("alice", PasswordHash::new_unchecked("hunter2"), connection)
            .expect("Could not create test user");

        create_account(user.id, connection)
            .expect("Could not create test account")
            .id
    }

    #[test]
    fn insert_operation_round_trips() {
        let connection = get_test_db_connection();
        let account_id = create_test_account(&connection);
        let date = datetime!(2025-11-02 14:30 UTC);

        let operation = insert_operation(
            account_id,
            None,
            OperationKind::Income,
            123.45,
            date,
            &connection,
        )
        .unwrap();

        assert!(operation.id > 0);
        assert_eq!(operation.account_id, account_id);
        assert_eq!(operation.category_id, None);
        assert_eq!(operation.kind, OperationKind::Income);
        assert_eq!(operation.amount, 123.45);
        assert_eq!(operation.date, date);

        let retrieved_operation = get_operation(operation.id, &connection).unwrap();
        assert_eq!(retrieved_operation, operation);
    }

    #[test]
    fn insert_operation_fails_with_non_existent_account() {
        let connection = get_test_db_connection();

        let result = insert_operation(
            42,
            None,
            OperationKind::Income,
            1.0,
            datetime!(2025-11-02 14:30 UTC),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn insert_operation_fails_with_non_existent_category() {
        let connection = get_test_db_connection();
        let account_id = create_test_account(&connection);

        let result = insert_operation(
            account_id,
            Some(999),
            OperationKind::Expense,
            1.0,
            datetime!(2025-11-02 14:30 UTC),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_operations_by_account_returns_operations_in_insertion_order() {
        let connection = get_test_db_connection();
        let account_id = create_test_account(&connection);
        let date = datetime!(2025-11-02 14:30 UTC);

        let first = insert_operation(
            account_id,
            None,
            OperationKind::Income,
            100.0,
            date,
            &connection,
        )
        .unwrap();
        let second = insert_operation(
            account_id,
            None,
            OperationKind::Expense,
            25.0,
            date,
            &connection,
        )
        .unwrap();

        let operations = get_operations_by_account(account_id, &connection).unwrap();

        assert_eq!(operations, vec![first, second]);
    }

    #[test]
    fn get_operations_by_account_returns_empty_for_no_operations() {
        let connection = get_test_db_connection();
        let account_id = create_test_account(&connection);

        let operations = get_operations_by_account(account_id, &connection).unwrap();

        assert_eq!(operations, vec![]);
    }

    #[test]
    fn deleting_category_clears_operation_reference() {
        let connection = get_test_db_connection();
        let account_id = create_test_account(&connection);
        let user = crate::user::get_user_by_username("alice", &connection).unwrap();
        let category = create_category(
            user.id,
            CategoryName::new_unchecked("Groceries"),
            CategoryLimit::new_unchecked(300.0),
            &connection,
        )
        .unwrap();

        let operation = insert_operation(
            account_id,
            Some(category.id),
            OperationKind::Expense,
            10.0,
            datetime!(2025-11-02 14:30 UTC),
            &connection,
        )
        .unwrap();
        assert_eq!(operation.category_id, Some(category.id));

        crate::category::delete_category(user.id, &category.name, &connection).unwrap();

        let retrieved_operation = get_operation(operation.id, &connection).unwrap();
        assert_eq!(retrieved_operation.category_id, None);
    }
}
