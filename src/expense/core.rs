//! Defines the core data model and database queries for expenses.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, category::ExpenseCategory, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// Alias for the integer type used for expense row IDs.
pub type ExpenseID = i64;

/// A single dated purchase recorded by a user.
///
/// To create a new `Expense`, use [Expense::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseID,
    /// The amount of money spent in dollars.
    pub amount: f64,
    /// When the money was spent.
    pub date: Date,
    /// A text description of what the expense was for.
    pub description: String,
    /// The category the expense is filed under.
    pub category: ExpenseCategory,
    /// The ID of the user that recorded the expense.
    pub user_id: UserID,
}

impl Expense {
    /// Create a new expense.
    ///
    /// Shortcut for [ExpenseBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str, user_id: UserID) -> ExpenseBuilder {
        ExpenseBuilder {
            amount,
            date,
            description: description.to_owned(),
            category: ExpenseCategory::Others,
            user_id,
        }
    }
}

/// A builder for creating [Expense] instances.
///
/// The category defaults to [ExpenseCategory::Others] when not set.
#[derive(Debug, PartialEq, Clone)]
pub struct ExpenseBuilder {
    /// The amount of money spent in dollars.
    pub amount: f64,

    /// The date when the money was spent.
    ///
    /// The date must not be in the future, expenses record spending that has
    /// already happened.
    pub date: Date,

    /// A human-readable description of the expense.
    ///
    /// # Examples
    /// - `"Weekly grocery shop"`
    /// - `"Bus fare to work"`
    pub description: String,

    /// The category of the expense, e.g. "Groceries", "Transport".
    pub category: ExpenseCategory,

    /// The ID of the user that the expense belongs to.
    pub user_id: UserID,
}

impl ExpenseBuilder {
    /// Set the category for the expense.
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = category;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new expense in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the builder's user ID does not refer to a registered
///   user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(builder: ExpenseBuilder, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "INSERT INTO expense (amount, date, description, category, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, date, description, category, user_id",
        )?
        .query_row(
            (
                builder.amount,
                builder.date,
                builder.description,
                builder.category.as_label(),
                builder.user_id.as_i64(),
            ),
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    Ok(expense)
}

/// Retrieve an expense from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_expense(id: ExpenseID, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT id, amount, date, description, category, user_id FROM expense WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_expense_row)?;

    Ok(expense)
}

/// Retrieve all of a user's expenses, newest first.
///
/// Rows are ordered by date descending and then by ID ascending so that
/// expenses recorded on the same day keep a stable order.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_expenses_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, amount, date, description, category, user_id FROM expense
             WHERE user_id = :user_id
             ORDER BY date DESC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Check that `expense` belongs to the user identified by `caller`.
///
/// Expenses are private, a user must not be able to view or modify another
/// user's expenses.
///
/// # Errors
/// This function will return an [Error::Forbidden] if `caller` is not the
/// owner of `expense`.
pub fn ensure_expense_owner(expense: &Expense, caller: UserID) -> Result<(), Error> {
    if expense.user_id != caller {
        return Err(Error::Forbidden);
    }

    Ok(())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('expense', 0)",
        (),
    )?;

    // Add composite index used by the dashboard page.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Expense.
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;
    let description = row.get(3)?;
    let category_label: String = row.get(4)?;
    let raw_user_id = row.get(5)?;

    let category = category_label.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown expense category \"{category_label}\"").into(),
        )
    })?;

    Ok(Expense {
        id,
        amount,
        date,
        description,
        category,
        user_id: UserID::new(raw_user_id),
    })
}

// ============================================================================
// TESTS
// ============================================================================
