//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, expense::create_expense_table, user::create_user_table};

/// Create the application's tables if they do not already exist.
///
/// Table creation runs in an exclusive transaction so that two processes
/// opening the same database file cannot interleave schema statements.
///
/// # Errors
///
/// This function will return an error if the SQL transaction could not be
/// created or committed.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    // The expense table references the user table, so the user table must be created first.
    create_user_table(&transaction)?;
    create_expense_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
