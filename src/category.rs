//! The closed set of categories an expense can be filed under.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A category for classifying expenses.
///
/// Categories are stored and compared by their human-readable label
/// (e.g. "Food"), so the database contents stay stable if the order of the
/// variants changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Bills,
    Clothing,
    Food,
    Groceries,
    Health,
    Leisure,
    Savings,
    Transport,
    Others,
}

impl ExpenseCategory {
    /// Every category, in display order for drop-down menus.
    pub const ALL: [ExpenseCategory; 9] = [
        ExpenseCategory::Bills,
        ExpenseCategory::Clothing,
        ExpenseCategory::Food,
        ExpenseCategory::Groceries,
        ExpenseCategory::Health,
        ExpenseCategory::Leisure,
        ExpenseCategory::Savings,
        ExpenseCategory::Transport,
        ExpenseCategory::Others,
    ];

    /// The label stored in the database and shown in the UI.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExpenseCategory::Bills => "Bills",
            ExpenseCategory::Clothing => "Clothing",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Health => "Health",
            ExpenseCategory::Leisure => "Leisure",
            ExpenseCategory::Savings => "Savings",
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Others => "Others",
        }
    }
}

impl Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

impl FromStr for ExpenseCategory {
    type Err = Error;

    /// Parse a category from its label.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidCategory] if `s` is not one of the known labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|category| category.as_label() == s)
            .ok_or_else(|| Error::InvalidCategory(s.to_string()))
    }
}
