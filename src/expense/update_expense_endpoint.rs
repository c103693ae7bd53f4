//! Defines the endpoint for updating an existing expense.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, debug_handler,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::{Connection, params};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    expense::{
        core::{ExpenseID, ensure_expense_owner, get_expense},
        create_expense_endpoint::ExpenseForm,
    },
    timezone::get_local_offset,
    user::UserID,
};

/// The state needed to update an expense.
#[derive(Debug, Clone)]
pub struct UpdateExpenseState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the update expense endpoint.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Where the client should be redirected after a successful update.
    pub redirect_url: Option<String>,
}

/// A route handler for updating an expense by its ID.
///
/// Redirects to `redirect_url` on success so that the client returns to the
/// dashboard with its filter selection intact.
#[debug_handler]
pub async fn update_expense_endpoint(
    State(state): State<UpdateExpenseState>,
    Path(expense_id): Path<ExpenseID>,
    Query(query_params): Query<QueryParams>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    if form.description.trim().is_empty() {
        return Error::EmptyDescription.into_alert_response();
    }

    let local_timezone = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => {
            tracing::error!("Invalid timezone {}", state.local_timezone);
            return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
        }
    };

    let today = OffsetDateTime::now_utc().to_offset(local_timezone).date();

    if form.date > today {
        return Error::FutureDate(form.date).into_alert_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let expense = match get_expense(expense_id, &connection) {
        Ok(expense) => expense,
        Err(error) => {
            tracing::error!("Could not get expense {expense_id}: {error}");
            return error.into_alert_response();
        }
    };

    if let Err(error) = ensure_expense_owner(&expense, user_id) {
        tracing::warn!("User {user_id} tried to update expense {expense_id} which they do not own");
        return error.into_alert_response();
    }

    match update_expense(expense_id, &form, &connection) {
        Ok(0) => {
            tracing::error!(
                "Could not update expense {expense_id}: update returned zero rows affected"
            );
            return Error::UpdateMissingExpense.into_alert_response();
        }
        Ok(_) => {}
        Err(error) => {
            tracing::error!("Could not update expense {expense_id}: {error}");
            return error.into_alert_response();
        }
    }

    let redirect_url = query_params
        .redirect_url
        .unwrap_or(endpoints::DASHBOARD_VIEW.to_owned());

    (HxRedirect(redirect_url), StatusCode::SEE_OTHER).into_response()
}

type RowsAffected = usize;

fn update_expense(
    id: ExpenseID,
    expense: &ExpenseForm,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE expense \
        SET \
            amount = ?1, \
            date = ?2, \
            description = ?3, \
            category = ?4 \
        WHERE id = ?5;",
            params![
                expense.amount,
                expense.date,
                expense.description,
                expense.category.as_label(),
                id,
            ],
        )
        .map_err(Error::from)
}
