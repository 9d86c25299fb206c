//! The 404 not found page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{endpoints, html::base};

/// Route handler for requests that match no route.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// Get a response containing the 404 not found page.
pub fn get_404_not_found_response() -> Response {
    let content = html! {
        h1 { "404 Not Found" }
        p { "The page you are looking for does not exist." }
        p { a href=(endpoints::DASHBOARD) { "Back to the dashboard" } }
    };

    (StatusCode::NOT_FOUND, base("Not Found", &content)).into_response()
}
