//! The dashboard page: the logged-in user's account details and all-time
//! totals at a glance.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, Error,
    account::{Account, get_account_by_user},
    endpoints,
    html::{base, format_currency},
    navigation::NavBar,
    query::{CategoryFilter, KindFilter, total_expense, total_income},
    user::{User, get_user_by_id},
};

fn dashboard_view(user: &User, account: &Account, income: f64, expense: f64) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD).into_html();

    let content = html! {
        (nav_bar)

        h1 { "Hello, " (user.username) }

        table {
            tbody {
                tr {
                    th { "Account number" }
                    td { (account.number) }
                }
                tr {
                    th { "Balance" }
                    td { (format_currency(account.balance)) }
                }
                tr {
                    th { "Total income" }
                    td { (format_currency(income)) }
                }
                tr {
                    th { "Total expenses" }
                    td { (format_currency(expense)) }
                }
            }
        }

        p class="muted" {
            "Share your account number with other users to receive transfers."
        }
    };

    base("Dashboard", &content)
}

/// Display the dashboard page for the logged-in user.
pub async fn get_dashboard_page(
    State(state): State<AppState>,
    Extension(user_id): Extension<crate::user::UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let account = get_account_by_user(user_id, &connection)?;
    let income = total_income(
        account.id,
        &KindFilter::All,
        &CategoryFilter::All,
        &connection,
    )?;
    let expense = total_expense(
        account.id,
        &KindFilter::All,
        &CategoryFilter::All,
        &connection,
    )?;

    Ok(dashboard_view(&user, &account, income, expense).into_response())
}
