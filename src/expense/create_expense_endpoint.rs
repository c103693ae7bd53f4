//! Defines the endpoint for recording a new expense.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error, endpoints,
    category::ExpenseCategory,
    expense::{Expense, core::create_expense},
    timezone::get_local_offset,
    user::UserID,
};

/// The state needed to create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating or editing an expense.
#[derive(Debug, Deserialize)]
pub struct ExpenseForm {
    /// The value of the expense in dollars.
    pub amount: f64,
    /// The date when the money was spent.
    pub date: Date,
    /// Text detailing what the expense was for.
    pub description: String,
    /// The category the expense is filed under.
    pub category: ExpenseCategory,
}

/// A route handler for recording a new expense, redirects to the dashboard on
/// success.
///
/// The expense is recorded against the logged in user, whose ID is inserted
/// into the request by the auth middleware.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
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

    let expense = Expense::build(form.amount, form.date, &form.description, user_id)
        .category(form.category);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = create_expense(expense, &connection) {
        tracing::error!("Could not create expense for user {user_id}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::{
        str::FromStr,
        sync::{Arc, Mutex},
    };

    use axum::{
        Extension,
        body::Body,
        extract::State,
        http::{Response, StatusCode},
    };
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use email_address::EmailAddress;
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, PasswordHash,
        category::ExpenseCategory,
        db::initialize,
        expense::get_expense,
        user::{User, create_user},
    };

    use super::{CreateExpenseState, ExpenseForm, create_expense_endpoint};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(connection: &Connection) -> User {
        create_user(
            EmailAddress::from_str("test@example.com").unwrap(),
            "Test",
            PasswordHash::new_unchecked("hunter2"),
            connection,
        )
        .expect("Could not create test user")
    }

    fn get_test_state(conn: Connection) -> CreateExpenseState {
        CreateExpenseState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn can_create_expense() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let state = get_test_state(conn);

        let form = ExpenseForm {
            description: "test expense".to_string(),
            amount: 12.3,
            date: OffsetDateTime::now_utc().date(),
            category: ExpenseCategory::Groceries,
        };

        let response = create_expense_endpoint(State(state.clone()), Extension(user.id), Form(form))
            .await;

        assert_redirects_to_dashboard(response);

        // Verify the expense was actually created by getting it by ID.
        // We know the first expense will have ID 1.
        let connection = state.db_connection.lock().unwrap();
        let expense = get_expense(1, &connection).unwrap();
        assert_eq!(expense.amount, 12.3);
        assert_eq!(expense.description, "test expense");
        assert_eq!(expense.category, ExpenseCategory::Groceries);
        assert_eq!(expense.user_id, user.id);
    }

    #[tokio::test]
    async fn create_rejects_future_date() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let state = get_test_state(conn);

        let form = ExpenseForm {
            description: "time travel".to_string(),
            amount: 1.0,
            date: OffsetDateTime::now_utc().date() + Duration::days(1),
            category: ExpenseCategory::Others,
        };

        let response = create_expense_endpoint(State(state.clone()), Extension(user.id), Form(form))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_expense(1, &connection), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn create_rejects_blank_description() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let state = get_test_state(conn);

        let form = ExpenseForm {
            description: "   ".to_string(),
            amount: 1.0,
            date: OffsetDateTime::now_utc().date(),
            category: ExpenseCategory::Others,
        };

        let response = create_expense_endpoint(State(state.clone()), Extension(user.id), Form(form))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_expense(1, &connection), Err(Error::NotFound));
    }

    #[test]
    fn form_deserialises_category_from_label() {
        let form: ExpenseForm = serde_html_form::from_str(
            "amount=12.30&date=2024-03-05&description=Weekly+shop&category=Groceries",
        )
        .unwrap();

        assert_eq!(form.amount, 12.3);
        assert_eq!(form.category, ExpenseCategory::Groceries);
        assert_eq!(form.description, "Weekly shop");
    }

    #[track_caller]
    fn assert_redirects_to_dashboard(response: Response<Body>) {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(HX_REDIRECT)
            .expect("expected response to have the header hx-redirect");
        assert_eq!(
            location, "/dashboard",
            "got redirect to {location:?}, want redirect to /dashboard"
        );
    }
}
