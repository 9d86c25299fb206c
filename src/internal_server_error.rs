//! The 500 internal server error page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::html;

use crate::html::base;

/// Get a response containing the generic internal server error page.
pub fn render_internal_server_error() -> Response {
    let content = html! {
        h1 { "Something went wrong" }
        p { "An unexpected error occurred. Try again later or check the server logs." }
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        base("Internal Server Error", &content),
    )
        .into_response()
}
