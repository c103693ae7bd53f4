//! Defines the route handler and page shown when a route or resource cannot be found.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// The error page shown when a route or resource cannot be found.
pub struct NotFoundError;

impl NotFoundError {
    pub fn into_html(self) -> Html<String> {
        Html(
            error_view(
                "Page Not Found",
                "404",
                "Something's missing.",
                "Sorry, we can't find that page. Head back to the dashboard.",
            )
            .into_string(),
        )
    }
}

impl IntoResponse for NotFoundError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, self.into_html()).into_response()
    }
}

/// The fallback handler for requests that do not match any route.
pub async fn get_404_not_found() -> Response {
    NotFoundError.into_response()
}
