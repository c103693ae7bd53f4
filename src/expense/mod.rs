//! Expense management for the expense tracking application.
//!
//! This module contains everything related to expenses:
//! - The `Expense` model and `ExpenseBuilder` for recording expenses
//! - Database functions for storing, querying, and managing expenses
//! - In-memory filtering of expenses by category and date
//! - View handlers for expense-related web pages

mod core;
mod create_expense_endpoint;
mod delete_expense_endpoint;
mod edit_expense_page;
mod filter;
mod new_expense_page;
mod update_expense_endpoint;

pub use core::{
    Expense, ExpenseBuilder, ExpenseID, create_expense, create_expense_table, ensure_expense_owner,
    get_expense, get_expenses_for_user, map_expense_row,
};
pub use create_expense_endpoint::create_expense_endpoint;
pub use delete_expense_endpoint::delete_expense_endpoint;
pub use edit_expense_page::get_edit_expense_page;
pub use filter::{ExpenseFilter, filter_expenses};
pub use new_expense_page::get_new_expense_page;
pub use update_expense_endpoint::update_expense_endpoint;
