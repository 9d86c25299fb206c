//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::auth_guard,
    categories_page::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        update_category_limit_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    not_found::get_404_not_found,
    operations_page::{create_operation_endpoint, create_transfer_endpoint, get_operations_page},
    register_user::{get_register_page, register_user},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, get(get_log_in_page).post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER, get(get_register_page))
        .route(endpoints::USERS, post(register_user));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD, get(get_dashboard_page))
        .route(
            endpoints::OPERATIONS,
            get(get_operations_page).post(create_operation_endpoint),
        )
        .route(endpoints::TRANSFERS, post(create_transfer_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(get_categories_page).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY_LIMIT,
            post(update_category_limit_endpoint),
        )
        .route(endpoints::DELETE_CATEGORY, post(delete_category_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page. The auth guard turns
/// this into a redirect to the log-in page for logged-out clients.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD)
}
