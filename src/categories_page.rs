//! The categories page: the user's spending categories with their limits and
//! remaining budgets, plus the forms for creating, re-limiting and deleting
//! categories.

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::get_account_by_user,
    category::{
        Category, CategoryLimit, CategoryName, create_category, delete_category,
        get_categories_by_user, update_category_limit,
    },
    endpoints,
    html::{base, error_message_view, format_currency},
    ledger::spent_in_category,
    navigation::NavBar,
    user::UserID,
};

/// A category row with the amount already spent in it.
struct CategoryRow {
    category: Category,
    spent: f64,
}

fn categories_table(rows: &[CategoryRow]) -> Markup {
    html! {
        @if rows.is_empty() {
            p class="muted" { "You have no categories yet." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Name" }
                        th { "Limit" }
                        th { "Spent" }
                        th { "Remaining" }
                        th { }
                    }
                }
                tbody {
                    @for row in rows {
                        tr {
                            td { (row.category.name) }
                            @if row.category.limit.is_unlimited() {
                                td { span class="muted" { "Unlimited" } }
                                td { (format_currency(row.spent)) }
                                td { span class="muted" { "Unlimited" } }
                            } @else {
                                td { (format_currency(row.category.limit.as_f64())) }
                                td { (format_currency(row.spent)) }
                                td { (format_currency(row.category.limit.remaining(row.spent))) }
                            }
                            td {
                                form class="inline" method="post" action=(endpoints::DELETE_CATEGORY) {
                                    input type="hidden" name="name" value=(row.category.name);
                                    button type="submit" class="link" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn new_category_form(error_message: Option<&str>) -> Markup {
    html! {
        fieldset {
            legend { "Add a category" }
            form class="stacked" method="post" action=(endpoints::CATEGORIES) {
                div {
                    label for="category-name" { "Name" }
                    input id="category-name" type="text" name="name" required;
                }
                div {
                    label for="category-limit" { "Spending limit" }
                    input id="category-limit" type="number" name="limit"
                        min="0" step="0.01" required;
                }

                (error_message_view(error_message))

                button type="submit" { "Add" }
            }
        }
    }
}

fn update_limit_form(error_message: Option<&str>) -> Markup {
    html! {
        fieldset {
            legend { "Change a spending limit" }
            form class="stacked" method="post" action=(endpoints::CATEGORY_LIMIT) {
                div {
                    label for="update-name" { "Category name" }
                    input id="update-name" type="text" name="name" required;
                }
                div {
                    label for="update-limit" { "New spending limit" }
                    input id="update-limit" type="number" name="limit"
                        min="0" step="0.01" required;
                }

                (error_message_view(error_message))

                button type="submit" { "Update" }
            }
        }
    }
}

/// Which of the page's forms an error message belongs to.
enum PageError<'a> {
    None,
    Create(&'a str),
    UpdateLimit(&'a str),
}

fn render_categories_page(
    state: &AppState,
    user_id: UserID,
    error: PageError,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let account = get_account_by_user(user_id, &connection)?;
    let categories = get_categories_by_user(user_id, &connection)?;

    let rows = categories
        .into_iter()
        .map(|category| {
            let spent = spent_in_category(account.id, category.id, &connection)?;

            Ok(CategoryRow { category, spent })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let nav_bar = NavBar::new(endpoints::CATEGORIES).into_html();

    let (create_error, update_error) = match error {
        PageError::None => (None, None),
        PageError::Create(message) => (Some(message), None),
        PageError::UpdateLimit(message) => (None, Some(message)),
    };

    let content = html! {
        (nav_bar)

        h1 { "Categories" }

        (categories_table(&rows))

        (new_category_form(create_error))
        (update_limit_form(update_error))
    };

    Ok(base("Categories", &content).into_response())
}

/// Display the categories page for the logged-in user.
pub async fn get_categories_page(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    render_categories_page(&state, user_id, PageError::None)
}

/// The raw data entered into the category creation and limit update forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryForm {
    /// The category name as entered.
    pub name: String,
    /// The spending limit as entered, parsed server-side.
    pub limit: String,
}

/// A route handler for creating a new category for the logged-in user.
pub async fn create_category_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<CategoryForm>,
) -> Result<Response, Error> {
    let name = match CategoryName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => {
            return render_categories_page(
                &state,
                user_id,
                PageError::Create(&error.to_string()),
            );
        }
    };

    let Ok(raw_limit) = form_data.limit.trim().parse::<f64>() else {
        return render_categories_page(
            &state,
            user_id,
            PageError::Create("Enter a number for the spending limit."),
        );
    };

    let limit = match CategoryLimit::new(raw_limit) {
        Ok(limit) => limit,
        Err(error) => {
            return render_categories_page(
                &state,
                user_id,
                PageError::Create(&error.to_string()),
            );
        }
    };

    let result = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        create_category(user_id, name, limit, &connection)
    };

    match result {
        Ok(_) => Ok(Redirect::to(endpoints::CATEGORIES).into_response()),
        Err(error @ Error::DuplicateCategoryName) => {
            render_categories_page(&state, user_id, PageError::Create(&error.to_string()))
        }
        Err(error) => {
            tracing::error!("could not create category: {error}");
            Err(error)
        }
    }
}

/// A route handler for changing the spending limit of one of the logged-in
/// user's categories.
///
/// The new limit is not checked against the amount already spent: a limit
/// below the current spend simply blocks further expenses in the category.
pub async fn update_category_limit_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<CategoryForm>,
) -> Result<Response, Error> {
    let name = match CategoryName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => {
            return render_categories_page(
                &state,
                user_id,
                PageError::UpdateLimit(&error.to_string()),
            );
        }
    };

    let Ok(raw_limit) = form_data.limit.trim().parse::<f64>() else {
        return render_categories_page(
            &state,
            user_id,
            PageError::UpdateLimit("Enter a number for the spending limit."),
        );
    };

    let limit = match CategoryLimit::new(raw_limit) {
        Ok(limit) => limit,
        Err(error) => {
            return render_categories_page(
                &state,
                user_id,
                PageError::UpdateLimit(&error.to_string()),
            );
        }
    };

    let result = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        update_category_limit(user_id, &name, limit, &connection)
    };

    match result {
        Ok(()) => Ok(Redirect::to(endpoints::CATEGORIES).into_response()),
        Err(Error::NotFound) => render_categories_page(
            &state,
            user_id,
            PageError::UpdateLimit("No category with this name was found."),
        ),
        Err(error) => {
            tracing::error!("could not update category limit: {error}");
            Err(error)
        }
    }
}

/// The raw data entered into the category deletion form.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCategoryForm {
    /// The name of the category to delete.
    pub name: String,
}

/// A route handler for deleting one of the logged-in user's categories.
///
/// Operations recorded under the category are kept and display as
/// uncategorized afterwards.
pub async fn delete_category_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<DeleteCategoryForm>,
) -> Result<Response, Error> {
    let name = match CategoryName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => {
            return render_categories_page(
                &state,
                user_id,
                PageError::Create(&error.to_string()),
            );
        }
    };

    let result = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        delete_category(user_id, &name, &connection)
    };

    match result {
        Ok(()) => Ok(Redirect::to(endpoints::CATEGORIES).into_response()),
        Err(Error::NotFound) => render_categories_page(
            &state,
            user_id,
            PageError::Create("No category with this name was found."),
        ),
        Err(error) => {
            tracing::error!("could not delete category: {error}");
            Err(error)
        }
    }
}

#[cfg(test)]
mod categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        AppState, Error,
        account::{Account, create_account},
        build_router,
        category::{CategoryLimit, CategoryName, create_category, get_category_by_name},
        db::initialize,
        endpoints,
        log_in::LogInData,
        operation::OperationKind,
        password::{PasswordHash, ValidatedPassword},
        user::{UserID, create_user},
    };

    use super::{CategoryForm, DeleteCategoryForm};

    const TEST_PASSWORD: &str = "averylongandsecurepassword";

    async fn get_logged_in_server() -> (TestServer, AppState, UserID, Account) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");

        let password_hash =
            PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4).unwrap();
        let user =
            create_user("alice", password_hash, &connection).expect("Could not create test user");
        let account =
            create_account(user.id, &connection).expect("Could not create test account");

        let state = AppState::new("42", Arc::new(Mutex::new(connection)));
        let mut server =
            TestServer::try_new(build_router(state.clone())).expect("Could not create test server");
        server.save_cookies();

        server
            .post(endpoints::LOG_IN)
            .form(&LogInData {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .assert_status_see_other();

        (server, state, user.id, account)
    }

    #[tokio::test]
    async fn categories_page_shows_limit_spent_and_remaining() {
        let (server, state, user_id, account) = get_logged_in_server().await;
        let category = {
            let connection = state.db_connection.lock().unwrap();
            create_category(
                user_id,
                CategoryName::new_unchecked("Food"),
                CategoryLimit::new_unchecked(50.0),
                &connection,
            )
            .unwrap()
        };
        state
            .ledger
            .record_operation(account.id, OperationKind::Income, 100.0, None)
            .unwrap();
        state
            .ledger
            .record_operation(account.id, OperationKind::Expense, 40.0, Some(category.id))
            .unwrap();

        let response = server.get(endpoints::CATEGORIES).await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Food"));
        assert!(text.contains("$50.00"), "limit should be rendered");
        assert!(text.contains("$40.00"), "spent should be rendered");
        assert!(text.contains("$10.00"), "remaining should be rendered");
    }

    #[tokio::test]
    async fn posting_category_creates_it_and_redirects() {
        let (server, state, user_id, _) = get_logged_in_server().await;

        let response = server
            .post(endpoints::CATEGORIES)
            .form(&CategoryForm {
                name: "Groceries".to_string(),
                limit: "300".to_string(),
            })
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::CATEGORIES);

        let connection = state.db_connection.lock().unwrap();
        let category = get_category_by_name(
            user_id,
            &CategoryName::new_unchecked("Groceries"),
            &connection,
        )
        .unwrap();
        assert_eq!(category.limit.as_f64(), 300.0);
    }

    #[tokio::test]
    async fn posting_duplicate_category_shows_error() {
        let (server, _, _, _) = get_logged_in_server().await;
        let form = CategoryForm {
            name: "Groceries".to_string(),
            limit: "300".to_string(),
        };

        server.post(endpoints::CATEGORIES).form(&form).await;

        let response = server.post(endpoints::CATEGORIES).form(&form).await;

        response.assert_status_ok();
        assert!(
            response
                .text()
                .contains("a category with this name already exists")
        );
    }

    #[tokio::test]
    async fn posting_negative_limit_shows_error() {
        let (server, _, _, _) = get_logged_in_server().await;

        let response = server
            .post(endpoints::CATEGORIES)
            .form(&CategoryForm {
                name: "Groceries".to_string(),
                limit: "-10".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("not a valid spending limit"));
    }

    #[tokio::test]
    async fn posting_limit_update_replaces_limit() {
        let (server, state, user_id, _) = get_logged_in_server().await;
        let name = CategoryName::new_unchecked("Groceries");
        {
            let connection = state.db_connection.lock().unwrap();
            create_category(
                user_id,
                name.clone(),
                CategoryLimit::new_unchecked(300.0),
                &connection,
            )
            .unwrap();
        }

        let response = server
            .post(endpoints::CATEGORY_LIMIT)
            .form(&CategoryForm {
                name: "Groceries".to_string(),
                limit: "150".to_string(),
            })
            .await;

        response.assert_status_see_other();

        let connection = state.db_connection.lock().unwrap();
        let category = get_category_by_name(user_id, &name, &connection).unwrap();
        assert_eq!(category.limit.as_f64(), 150.0);
    }

    #[tokio::test]
    async fn posting_limit_update_for_unknown_category_shows_error() {
        let (server, _, _, _) = get_logged_in_server().await;

        let response = server
            .post(endpoints::CATEGORY_LIMIT)
            .form(&CategoryForm {
                name: "Nope".to_string(),
                limit: "150".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert!(
            response
                .text()
                .contains("No category with this name was found.")
        );
    }

    #[tokio::test]
    async fn posting_delete_removes_category() {
        let (server, state, user_id, _) = get_logged_in_server().await;
        let name = CategoryName::new_unchecked("Groceries");
        {
            let connection = state.db_connection.lock().unwrap();
            create_category(
                user_id,
                name.clone(),
                CategoryLimit::new_unchecked(300.0),
                &connection,
            )
            .unwrap();
        }

        let response = server
            .post(endpoints::DELETE_CATEGORY)
            .form(&DeleteCategoryForm {
                name: "Groceries".to_string(),
            })
            .await;

        response.assert_status_see_other();

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_category_by_name(user_id, &name, &connection),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn unlimited_transfer_category_renders_as_unlimited() {
        let (server, state, _user_id, account) = get_logged_in_server().await;
        {
            // Receiving money from a transfer creates no category for the
            // recipient; sending one creates the sender's reserved category.
            let connection = state.db_connection.lock().unwrap();
            let recipient = create_user(
                "bob",
                PasswordHash::new_unchecked("hunter2"),
                &connection,
            )
            .unwrap();
            create_account(recipient.id, &connection).unwrap();
            drop(connection);

            state
                .ledger
                .record_operation(account.id, OperationKind::Income, 100.0, None)
                .unwrap();
            let recipient_account = {
                let connection = state.db_connection.lock().unwrap();
                crate::account::get_account_by_user(recipient.id, &connection).unwrap()
            };
            state
                .ledger
                .transfer(account.id, recipient_account.number, 10.0)
                .unwrap();
        }

        let response = server.get(endpoints::CATEGORIES).await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Transfer"));
        assert!(text.contains("Unlimited"));

        // One row for the single category.
        let document = Html::parse_document(&text);
        let rows = Selector::parse("tbody tr").unwrap();
        assert_eq!(document.select(&rows).count(), 1);
    }
}
