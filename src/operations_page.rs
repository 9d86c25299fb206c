//! The operations page: the filterable operation history with its totals,
//! plus the forms for recording an operation and sending a transfer.

use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, DatabaseID, Error,
    account::{AccountNumber, get_account_by_user},
    category::{Category, CategoryName, TRANSFER_CATEGORY_NAME, get_categories_by_user},
    endpoints,
    html::{base, error_message_view, format_currency, format_timestamp},
    navigation::NavBar,
    operation::{Operation, OperationKind},
    query::{
        CategoryFilter, KindFilter, category_names_by_id, filtered_operations, total_expense,
        total_income,
    },
    user::UserID,
};

/// The form value that matches every kind in the kind filter.
const KIND_VALUE_ALL: &str = "all";
/// The form value that matches every category in the category filter.
const CATEGORY_VALUE_ALL: &str = "all";
/// The form value that matches uncategorized operations in the category
/// filter.
const CATEGORY_VALUE_NONE: &str = "uncategorized";

/// The filter selections encoded in the page's query string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OperationFilterParams {
    /// The selected category name, [CATEGORY_VALUE_ALL] or
    /// [CATEGORY_VALUE_NONE].
    pub category: Option<String>,
    /// The selected kind, or [KIND_VALUE_ALL].
    pub kind: Option<String>,
}

impl OperationFilterParams {
    fn kind_filter(&self) -> KindFilter {
        match self.kind.as_deref() {
            Some("income") => KindFilter::Only(OperationKind::Income),
            Some("expense") => KindFilter::Only(OperationKind::Expense),
            _ => KindFilter::All,
        }
    }

    fn category_filter(&self) -> CategoryFilter {
        match self.category.as_deref() {
            None | Some("") | Some(CATEGORY_VALUE_ALL) => CategoryFilter::All,
            Some(CATEGORY_VALUE_NONE) => CategoryFilter::Uncategorized,
            Some(name) => CategoryFilter::Name(CategoryName::new_unchecked(name)),
        }
    }
}

fn filter_form(filter: &OperationFilterParams, categories: &[Category]) -> Markup {
    let kind_filter = filter.kind_filter();
    let category_filter = filter.category_filter();

    html! {
        form method="get" action=(endpoints::OPERATIONS) {
            label for="filter-kind" { "Type" }
            select id="filter-kind" name="kind" {
                option value=(KIND_VALUE_ALL) { "All types" }
                option value="income" selected[kind_filter == KindFilter::Only(OperationKind::Income)] {
                    "Income"
                }
                option value="expense" selected[kind_filter == KindFilter::Only(OperationKind::Expense)] {
                    "Expense"
                }
            }

            label for="filter-category" { "Category" }
            select id="filter-category" name="category" {
                option value=(CATEGORY_VALUE_ALL) { "All categories" }
                option value=(CATEGORY_VALUE_NONE) selected[category_filter == CategoryFilter::Uncategorized] {
                    "Uncategorized"
                }
                @for category in categories {
                    option
                        value=(category.name)
                        selected[category_filter == CategoryFilter::Name(category.name.clone())]
                    {
                        (category.name)
                    }
                }
            }

            button type="submit" { "Apply" }
        }
    }
}

fn operations_table(
    operations: &[Operation],
    category_names: impl Fn(DatabaseID) -> Option<CategoryName>,
) -> Markup {
    html! {
        @if operations.is_empty() {
            p class="muted" { "No operations match the selected filters." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Date" }
                        th { "Type" }
                        th { "Category" }
                        th { "Amount" }
                    }
                }
                tbody {
                    @for operation in operations {
                        tr {
                            td { (format_timestamp(&operation.date)) }
                            td { (operation.kind) }
                            td {
                                @match operation.category_id.and_then(&category_names) {
                                    Some(name) => { (name) }
                                    None => { span class="muted" { "Uncategorized" } }
                                }
                            }
                            td { (format_currency(operation.amount)) }
                        }
                    }
                }
            }
        }
    }
}

fn new_operation_form(categories: &[Category], error_message: Option<&str>) -> Markup {
    html! {
        fieldset {
            legend { "Record an operation" }
            form class="stacked" method="post" action=(endpoints::OPERATIONS) {
                div {
                    label { "Type" }
                    label {
                        input type="radio" name="kind" value="income" checked;
                        " Income"
                    }
                    label {
                        input type="radio" name="kind" value="expense";
                        " Expense"
                    }
                }
                div {
                    label for="operation-amount" { "Amount" }
                    input id="operation-amount" type="number" name="amount"
                        min="0.01" step="0.01" required;
                }
                div {
                    label for="operation-category" { "Category" }
                    select id="operation-category" name="category" {
                        option value="" { "No category" }
                        // The reserved transfer category is not offered; it
                        // is only ever attached by the ledger itself.
                        @for category in categories {
                            @if category.name.as_ref() != TRANSFER_CATEGORY_NAME {
                                option value=(category.id) { (category.name) }
                            }
                        }
                    }
                }

                (error_message_view(error_message))

                button type="submit" { "Record" }
            }
        }
    }
}

fn transfer_form(error_message: Option<&str>) -> Markup {
    html! {
        fieldset {
            legend { "Send a transfer" }
            form class="stacked" method="post" action=(endpoints::TRANSFERS) {
                div {
                    label for="transfer-recipient" { "Recipient account number" }
                    input id="transfer-recipient" type="text" name="recipient_number"
                        inputmode="numeric" required;
                }
                div {
                    label for="transfer-amount" { "Amount" }
                    input id="transfer-amount" type="number" name="amount"
                        min="0.01" step="0.01" required;
                }

                (error_message_view(error_message))

                button type="submit" { "Send" }
            }
        }
    }
}

/// Which of the page's forms an error message belongs to.
enum PageError<'a> {
    None,
    Operation(&'a str),
    Transfer(&'a str),
}

fn render_operations_page(
    state: &AppState,
    user_id: UserID,
    filter: &OperationFilterParams,
    error: PageError,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let account = get_account_by_user(user_id, &connection)?;
    let categories = get_categories_by_user(user_id, &connection)?;

    let kind_filter = filter.kind_filter();
    let category_filter = filter.category_filter();

    let operations =
        filtered_operations(account.id, &kind_filter, &category_filter, &connection)?;
    let names = category_names_by_id(&operations, &connection)?;
    let income = total_income(account.id, &kind_filter, &category_filter, &connection)?;
    let expense = total_expense(account.id, &kind_filter, &category_filter, &connection)?;

    let nav_bar = NavBar::new(endpoints::OPERATIONS).into_html();

    let (operation_error, transfer_error) = match error {
        PageError::None => (None, None),
        PageError::Operation(message) => (Some(message), None),
        PageError::Transfer(message) => (None, Some(message)),
    };

    let content = html! {
        (nav_bar)

        h1 { "Operations" }

        (filter_form(filter, &categories))

        (operations_table(&operations, |category_id| {
            names.get(&category_id).cloned().flatten()
        }))

        p {
            "Income total: " (format_currency(income))
            " · Expense total: " (format_currency(expense))
        }

        (new_operation_form(&categories, operation_error))
        (transfer_form(transfer_error))
    };

    Ok(base("Operations", &content).into_response())
}

/// Display the operations page with the filters in the query string applied.
pub async fn get_operations_page(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<OperationFilterParams>,
) -> Result<Response, Error> {
    render_operations_page(&state, user_id, &filter, PageError::None)
}

/// The raw data entered into the record-operation form.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationForm {
    /// Either `income` or `expense`.
    pub kind: String,
    /// The amount as entered, parsed server-side.
    pub amount: String,
    /// The selected category ID, or an empty string for no category.
    pub category: Option<String>,
}

/// A route handler for recording a new operation against the logged-in
/// user's account.
pub async fn create_operation_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<OperationForm>,
) -> Result<Response, Error> {
    let kind = match form_data.kind.as_str() {
        "income" => OperationKind::Income,
        "expense" => OperationKind::Expense,
        _ => {
            return render_operations_page(
                &state,
                user_id,
                &OperationFilterParams::default(),
                PageError::Operation("Choose an operation type."),
            );
        }
    };

    let Ok(amount) = form_data.amount.trim().parse::<f64>() else {
        return render_operations_page(
            &state,
            user_id,
            &OperationFilterParams::default(),
            PageError::Operation("Enter a number for the amount."),
        );
    };

    let category_id = match form_data.category.as_deref() {
        None | Some("") => None,
        Some(raw_id) => match raw_id.parse::<DatabaseID>() {
            Ok(id) => Some(id),
            Err(_) => {
                return render_operations_page(
                    &state,
                    user_id,
                    &OperationFilterParams::default(),
                    PageError::Operation("Choose a valid category."),
                );
            }
        },
    };

    let account = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_account_by_user(user_id, &connection)?
    };

    match state
        .ledger
        .record_operation(account.id, kind, amount, category_id)
    {
        Ok(_) => Ok(Redirect::to(endpoints::OPERATIONS).into_response()),
        Err(error @ (Error::InvalidAmount(_) | Error::InsufficientFunds)) => {
            render_operations_page(
                &state,
                user_id,
                &OperationFilterParams::default(),
                PageError::Operation(&error.to_string()),
            )
        }
        Err(Error::LimitExceeded { remaining }) => {
            let message = format!(
                "The category spending limit is exhausted. Remaining: {}",
                format_currency(remaining)
            );
            render_operations_page(
                &state,
                user_id,
                &OperationFilterParams::default(),
                PageError::Operation(&message),
            )
        }
        Err(error) => {
            tracing::error!("could not record operation: {error}");
            Err(error)
        }
    }
}

/// The raw data entered into the transfer form.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferForm {
    /// The recipient's account number as entered, parsed server-side.
    pub recipient_number: String,
    /// The amount as entered, parsed server-side.
    pub amount: String,
}

/// A route handler for sending money from the logged-in user's account to
/// the account with the posted account number.
pub async fn create_transfer_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<TransferForm>,
) -> Result<Response, Error> {
    let recipient_number = form_data.recipient_number.trim();

    if recipient_number.is_empty() {
        return render_operations_page(
            &state,
            user_id,
            &OperationFilterParams::default(),
            PageError::Transfer("Enter the recipient's account number."),
        );
    }

    let Ok(recipient_number) = recipient_number.parse::<i64>() else {
        return render_operations_page(
            &state,
            user_id,
            &OperationFilterParams::default(),
            PageError::Transfer("Enter a valid account number."),
        );
    };

    let Ok(amount) = form_data.amount.trim().parse::<f64>() else {
        return render_operations_page(
            &state,
            user_id,
            &OperationFilterParams::default(),
            PageError::Transfer("Enter a number for the amount."),
        );
    };

    let account = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_account_by_user(user_id, &connection)?
    };

    match state
        .ledger
        .transfer(account.id, AccountNumber::new(recipient_number), amount)
    {
        Ok(_) => Ok(Redirect::to(endpoints::OPERATIONS).into_response()),
        Err(
            error @ (Error::RecipientNotFound
            | Error::InvalidAmount(_)
            | Error::InsufficientFunds),
        ) => render_operations_page(
            &state,
            user_id,
            &OperationFilterParams::default(),
            PageError::Transfer(&error.to_string()),
        ),
        Err(error) => {
            tracing::error!("could not send transfer: {error}");
            Err(error)
        }
    }
}
