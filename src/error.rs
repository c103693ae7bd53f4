//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use time::Date;

use crate::{
    alert::Alert, html::error_view, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email and password combination that does not
    /// match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing a date-time in the auth token or creating
    /// the new expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format auth token date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The email used to register is already taken by another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The caller is authenticated but does not own the expense they tried to
    /// read or modify.
    #[error("the expense belongs to a different user")]
    Forbidden,

    /// A string was used as a category label that is not in the category set.
    #[error("\"{0}\" is not a known expense category")]
    InvalidCategory(String),

    /// An expense was submitted without a description.
    #[error("expense description cannot be empty")]
    EmptyDescription,

    /// A date in the future was used to create or edit an expense.
    ///
    /// Expenses record spending that has already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A summary was requested for an empty collection of expenses.
    ///
    /// Callers should show a "no data" state instead of charts.
    #[error("there are no expenses to summarize")]
    NoDataToAggregate,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to update an expense that does not exist
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(
                    error_view(
                        "Access Denied",
                        "403",
                        "This expense belongs to a different account.",
                        "Go back to the dashboard and pick one of your own expenses.",
                    )
                    .into_string(),
                ),
            )
                .into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::FutureDate(date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid expense date".to_owned(),
                    details: format!(
                        "{date} is a date in the future, which is not allowed. Change the date to \
                        today or earlier."
                    ),
                },
            ),
            Error::InvalidCategory(label) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid category".to_owned(),
                    details: format!("\"{label}\" is not one of the available expense categories."),
                },
            ),
            Error::EmptyDescription => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Missing description".to_owned(),
                    details: "Enter a short description of what the expense was for.".to_owned(),
                },
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                Alert::Error {
                    message: "Access denied".to_owned(),
                    details: "This expense belongs to a different account.".to_owned(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not find expense".to_owned(),
                    details: "The expense could not be found. \
                    Try refreshing the page to see the current list."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingExpense => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update expense".to_owned(),
                    details: "The expense could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingExpense => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete expense".to_owned(),
                    details: "The expense could not be found. \
                    Try refreshing the page to see if the expense has already been deleted."
                        .to_owned(),
                },
            ),
            Error::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Email already registered".to_owned(),
                    details: "An account with that email address already exists. \
                    Try logging in instead."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}
