//! Defines the spending category and the database functions for managing
//! categories. A category is a named bucket that expense operations are
//! recorded against, carrying a limit on the total amount that may ever be
//! spent in it. The reserved "Transfer" category is created lazily by the
//! [ledger](crate::Ledger) with an unlimited sentinel limit.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{DatabaseID, Error, user::UserID};

/// The name of the reserved category that transfer operations are recorded
/// under. It is created on demand, once per user, and is exempt from limit
/// checks by virtue of its unlimited limit.
pub(crate) const TRANSFER_CATEGORY_NAME: &str = "Transfer";

/// The name of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    /// Returns an [Error::InvalidCategoryName] if `name` is empty or only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::InvalidCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-empty invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The maximum total amount that may be spent in a category over all time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryLimit(f64);

impl CategoryLimit {
    /// The sentinel limit of the reserved "Transfer" category. Large enough
    /// that no realistic spend can ever reach it.
    pub const UNLIMITED: Self = Self(f64::MAX);

    /// Create a spending limit.
    ///
    /// # Errors
    /// Returns an [Error::InvalidLimit] if `limit` is negative or not a
    /// finite number.
    pub fn new(limit: f64) -> Result<Self, Error> {
        if limit.is_finite() && limit >= 0.0 {
            Ok(Self(limit))
        } else {
            Err(Error::InvalidLimit(limit))
        }
    }

    /// Create a spending limit without validation.
    ///
    /// The caller should ensure that the limit is not negative.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-negative invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(limit: f64) -> Self {
        Self(limit)
    }

    /// The underlying limit amount.
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Whether this is the unlimited sentinel.
    pub fn is_unlimited(&self) -> bool {
        self.0 == f64::MAX
    }

    /// The amount that can still be spent given that `spent` has already been
    /// spent in the category.
    ///
    /// The result is negative when the limit was lowered below the amount
    /// already spent.
    pub fn remaining(&self, spent: f64) -> f64 {
        self.0 - spent
    }
}

/// A named spending bucket with a limit, e.g. 'Groceries' with a limit of
/// 300.00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: DatabaseID,
    /// The ID of the user that owns the category.
    pub user_id: UserID,
    /// The name of the category, unique per user.
    pub name: CategoryName,
    /// The maximum total expense amount allowed in this category.
    pub limit: CategoryLimit,
}

/// Create a category in the database.
///
/// # Errors
/// Returns an:
/// - [Error::DuplicateCategoryName] if the user already has a category called
///   `name`,
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserID,
    name: CategoryName,
    limit: CategoryLimit,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (user_id, name, spending_limit) VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), name.as_ref(), limit.as_f64()),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name,
        limit,
    })
}

/// Get the category that has the specified `id`.
///
/// The lookup is not scoped to a user: the income leg of a transfer refers to
/// the sender's "Transfer" category, which the recipient must still be able
/// to resolve for display.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no category with `id`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_category(id: DatabaseID, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, user_id, name, spending_limit FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Get the category owned by the user with `user_id` that is called `name`.
///
/// # Errors
/// Returns an [Error::NotFound] if the user has no category with that name,
/// or an [Error::SqlError] if there is some other SQL error.
pub fn get_category_by_name(
    user_id: UserID,
    name: &CategoryName,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, spending_limit FROM category
             WHERE user_id = ?1 AND name = ?2",
        )?
        .query_row((user_id.as_i64(), name.as_ref()), map_row)
        .map_err(|error| error.into())
}

/// Get all categories owned by the user with `user_id`, in the order they
/// were created.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_categories_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, spending_limit FROM category
             WHERE user_id = :user_id ORDER BY id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Replace the spending limit of the category owned by the user with
/// `user_id` that is called `name`.
///
/// The new limit is not validated against the amount already spent in the
/// category: a limit lowered below the current spend is accepted and simply
/// blocks further expenses until the spend falls back under it.
///
/// # Errors
/// Returns an [Error::NotFound] if the user has no category with that name,
/// or an [Error::SqlError] if there is some other SQL error.
pub fn update_category_limit(
    user_id: UserID,
    name: &CategoryName,
    new_limit: CategoryLimit,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET spending_limit = ?1 WHERE user_id = ?2 AND name = ?3",
        (new_limit.as_f64(), user_id.as_i64(), name.as_ref()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete the category owned by the user with `user_id` that is called
/// `name`.
///
/// Operations that referenced the category are not rewritten; they display as
/// uncategorized afterwards.
///
/// # Errors
/// Returns an [Error::NotFound] if the user has no category with that name,
/// or an [Error::SqlError] if there is some other SQL error.
pub fn delete_category(
    user_id: UserID,
    name: &CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE user_id = ?1 AND name = ?2",
        (user_id.as_i64(), name.as_ref()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub(crate) fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            spending_limit REAL NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_user_id = row.get(1)?;
    let raw_name: String = row.get(2)?;
    let raw_limit = row.get(3)?;

    Ok(Category {
        id,
        user_id: UserID::new(raw_user_id),
        name: CategoryName::new_unchecked(&raw_name),
        limit: CategoryLimit::new_unchecked(raw_limit),
    })
}

#[cfg(test)]
mod category_name_tests {
    use crate::Error;

    use super::CategoryName;

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert_eq!(name, Err(Error::InvalidCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert_eq!(name, Err(Error::InvalidCategoryName));
    }

    #[test]
    fn new_trims_whitespace() {
        let name = CategoryName::new("  Groceries ").unwrap();

        assert_eq!(name.as_ref(), "Groceries");
    }
}
