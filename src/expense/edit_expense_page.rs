//! Defines the route handler for the page for editing an existing expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    category::ExpenseCategory,
    endpoints::{self, format_endpoint},
    expense::core::{Expense, ExpenseID, ensure_expense_owner, get_expense},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        dollar_input_styles, loading_spinner,
    },
    navigation::NavBar,
    timezone::get_local_offset,
    user::UserID,
};

fn edit_expense_view(expense: &Expense, max_date: Date, update_route: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_EXPENSE_VIEW).into_html();
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(update_route)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Edit Expense" }

                div
                {
                    label
                        for="amount"
                        class=(FORM_LABEL_STYLE)
                    {
                        "Amount"
                    }

                    // w-full needed to ensure input takes the full width when prefilled with a value
                    div class="input-wrapper w-full"
                    {
                        input
                            name="amount"
                            id="amount"
                            type="number"
                            step="0.01"
                            value=(expense.amount)
                            required
                            autofocus
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                div
                {
                    label
                        for="date"
                        class=(FORM_LABEL_STYLE)
                    {
                        "Date"
                    }

                    input
                        name="date"
                        id="date"
                        type="date"
                        max=(max_date)
                        required
                        value=(expense.date)
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label
                        for="description"
                        class=(FORM_LABEL_STYLE)
                    {
                        "Description"
                    }

                    input
                        name="description"
                        id="description"
                        type="text"
                        value=(expense.description)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label
                        for="category"
                        class=(FORM_LABEL_STYLE)
                    {
                        "Category"
                    }

                    select
                        name="category"
                        id="category"
                        required
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for category in ExpenseCategory::ALL {
                            option value=(category) selected[category == expense.category] {
                                (category)
                            }
                        }
                    }
                }

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Save Changes"
                }
            }
        }
    };

    base("Edit Expense", &[dollar_input_styles()], &content)
}

/// The state needed for the edit expense page.
#[derive(Debug, Clone)]
pub struct EditExpensePageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for accessing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditExpensePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the edit expense page.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Where the client should be sent after saving, so the dashboard keeps
    /// its filter selection.
    pub redirect_url: Option<String>,
}

/// Renders the page for editing an expense.
///
/// Only the user that recorded an expense may edit it.
pub async fn get_edit_expense_page(
    State(state): State<EditExpensePageState>,
    Path(expense_id): Path<ExpenseID>,
    Query(query_params): Query<QueryParams>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let expense = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let expense = get_expense(expense_id, &connection)
            .inspect_err(|error| {
                tracing::error!("Failed to retrieve expense {expense_id}: {error}")
            })?;

        ensure_expense_owner(&expense, user_id).inspect_err(|_| {
            tracing::warn!(
                "User {user_id} tried to open the edit page for expense {expense_id} which they do not own"
            )
        })?;

        expense
    };

    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone)
    })?;

    let max_date = OffsetDateTime::now_utc().to_offset(local_timezone).date();

    let mut update_route = format_endpoint(endpoints::EXPENSE_API, expense_id);

    if let Some(param) = query_params
        .redirect_url
        .as_deref()
        .and_then(build_redirect_param)
    {
        update_route = format!("{update_route}?{param}");
    }

    Ok(edit_expense_view(&expense, max_date, &update_route).into_response())
}

fn build_redirect_param(redirect_url: &str) -> Option<String> {
    serde_urlencoded::to_string([("redirect_url", &redirect_url)])
        .inspect_err(|error| {
            tracing::error!(
                "Could not set redirect URL {redirect_url} due to encoding error: {error}"
            );
        })
        .ok()
}
