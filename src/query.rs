//! Read-only filtered and aggregated views over an account's operation
//! history, used by the operations page and the dashboard totals.
//!
//! Results are recomputed from persisted state on every call and returned in
//! the order the operations were recorded, so repeated calls with no
//! intervening mutation return identical sequences.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::{
    DatabaseID, Error,
    category::{CategoryName, get_category},
    operation::{Operation, OperationKind, get_operations_by_account},
};

/// Which operation kinds a query should keep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KindFilter {
    /// Keep operations of every kind.
    All,
    /// Keep only operations of one kind.
    Only(OperationKind),
}

/// Which categories a query should keep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Keep operations in every category, including none.
    All,
    /// Keep operations with no category, or whose category no longer exists.
    Uncategorized,
    /// Keep operations whose category resolves to the given name.
    Name(CategoryName),
}

/// Get the operations on the account with `account_id` that match both
/// filters, in the order they were recorded.
///
/// Category matching works on the *resolved* category: an operation whose
/// category ID no longer resolves to a category counts as uncategorized.
/// Resolution is by ID and not scoped to a user, so the income leg of a
/// transfer matches the sender's "Transfer" category by name.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn filtered_operations(
    account_id: DatabaseID,
    kind_filter: &KindFilter,
    category_filter: &CategoryFilter,
    connection: &Connection,
) -> Result<Vec<Operation>, Error> {
    let operations = get_operations_by_account(account_id, connection)?;
    let category_names = category_names_by_id(&operations, connection)?;

    Ok(operations
        .into_iter()
        .filter(|operation| {
            matches_kind(operation, kind_filter)
                && matches_category(operation, category_filter, &category_names)
        })
        .collect())
}

/// The sum of the income operations on the account with `account_id` that
/// match both filters.
///
/// Note that the kind filter is applied *before* summing: the income total
/// under an expense-only filter is zero.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn total_income(
    account_id: DatabaseID,
    kind_filter: &KindFilter,
    category_filter: &CategoryFilter,
    connection: &Connection,
) -> Result<f64, Error> {
    total_of_kind(
        OperationKind::Income,
        account_id,
        kind_filter,
        category_filter,
        connection,
    )
}

/// The sum of the expense operations on the account with `account_id` that
/// match both filters.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn total_expense(
    account_id: DatabaseID,
    kind_filter: &KindFilter,
    category_filter: &CategoryFilter,
    connection: &Connection,
) -> Result<f64, Error> {
    total_of_kind(
        OperationKind::Expense,
        account_id,
        kind_filter,
        category_filter,
        connection,
    )
}

fn total_of_kind(
    kind: OperationKind,
    account_id: DatabaseID,
    kind_filter: &KindFilter,
    category_filter: &CategoryFilter,
    connection: &Connection,
) -> Result<f64, Error> {
    let operations = filtered_operations(account_id, kind_filter, category_filter, connection)?;

    Ok(operations
        .iter()
        .filter(|operation| operation.kind == kind)
        .map(|operation| operation.amount)
        .sum())
}

/// Resolve the name of each distinct category ID referenced by `operations`.
///
/// IDs that no longer resolve to a category map to `None`; the operations
/// referencing them display and filter as uncategorized.
pub(crate) fn category_names_by_id(
    operations: &[Operation],
    connection: &Connection,
) -> Result<HashMap<DatabaseID, Option<CategoryName>>, Error> {
    let mut names = HashMap::new();

    for operation in operations {
        let Some(category_id) = operation.category_id else {
            continue;
        };

        if names.contains_key(&category_id) {
            continue;
        }

        let name = match get_category(category_id, connection) {
            Ok(category) => Some(category.name),
            Err(Error::NotFound) => None,
            Err(error) => return Err(error),
        };

        names.insert(category_id, name);
    }

    Ok(names)
}

fn matches_kind(operation: &Operation, filter: &KindFilter) -> bool {
    match filter {
        KindFilter::All => true,
        KindFilter::Only(kind) => operation.kind == *kind,
    }
}

fn matches_category(
    operation: &Operation,
    filter: &CategoryFilter,
    category_names: &HashMap<DatabaseID, Option<CategoryName>>,
) -> bool {
    let resolved_name = operation
        .category_id
        .and_then(|category_id| category_names.get(&category_id))
        .and_then(|name| name.as_ref());

    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Uncategorized => resolved_name.is_none(),
        CategoryFilter::Name(name) => resolved_name == Some(name),
    }
}
