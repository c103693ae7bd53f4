//! Defines the endpoint for deleting an expense.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    expense::core::{ExpenseID, ensure_expense_owner, get_expense},
    user::UserID,
};

/// The state needed to delete an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting an expense by its ID.
///
/// Only the user that recorded an expense may delete it.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Path(expense_id): Path<ExpenseID>,
    Extension(user_id): Extension<UserID>,
) -> Response {
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
        tracing::warn!("User {user_id} tried to delete expense {expense_id} which they do not own");
        return error.into_alert_response();
    }

    match delete_expense(expense_id, &connection) {
        Ok(0) => Error::DeleteMissingExpense.into_alert_response(),
        // The status code has to be 200 OK or HTMX will not delete the table row.
        // The body carries only the out-of-band alert.
        Ok(_) => Alert::Success {
            message: "Expense deleted.".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete expense {expense_id}: {error}");
            error.into_alert_response()
        }
    }
}

type RowsAffected = usize;

fn delete_expense(id: ExpenseID, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM expense WHERE id = :id", &[(":id", &id)])
        .map_err(|err| err.into())
}

#[cfg(test)]
mod delete_expense_tests {
    use std::{
        str::FromStr,
        sync::{Arc, Mutex},
    };

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use email_address::EmailAddress;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, PasswordHash,
        category::ExpenseCategory,
        db::initialize,
        expense::{Expense, create_expense, get_expense},
        user::{User, UserID, create_user},
    };

    use super::{DeleteExpenseState, delete_expense_endpoint};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(email: &str, connection: &Connection) -> User {
        create_user(
            EmailAddress::from_str(email).unwrap(),
            "Test",
            PasswordHash::new_unchecked("hunter2"),
            connection,
        )
        .expect("Could not create test user")
    }

    fn create_test_expense(user_id: UserID, connection: &Connection) -> Expense {
        create_expense(
            Expense::build(42.0, date!(2024 - 04 - 01), "bus fare", user_id)
                .category(ExpenseCategory::Transport),
            connection,
        )
        .expect("Could not create test expense")
    }

    #[tokio::test]
    async fn deletes_expense() {
        let conn = get_test_connection();
        let user = create_test_user("test@example.com", &conn);
        let expense = create_test_expense(user.id, &conn);
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            delete_expense_endpoint(State(state.clone()), Path(expense.id), Extension(user.id))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_expense(expense.id, &connection), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn delete_returns_not_found_for_missing_expense() {
        let conn = get_test_connection();
        let user = create_test_user("test@example.com", &conn);
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            delete_expense_endpoint(State(state), Path(999), Extension(user.id)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_rejects_other_users_expense() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let intruder = create_test_user("intruder@example.com", &conn);
        let expense = create_test_expense(owner.id, &conn);
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            delete_expense_endpoint(State(state.clone()), Path(expense.id), Extension(intruder.id))
                .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let connection = state.db_connection.lock().unwrap();
        assert!(
            get_expense(expense.id, &connection).is_ok(),
            "expense should not have been deleted"
        );
    }
}
