//! Narrows a collection of expenses by optional category, month and year criteria.

use time::{Date, Month};

use crate::{category::ExpenseCategory, expense::Expense};

/// The criteria for narrowing down the expenses shown on the dashboard.
///
/// Omitted criteria impose no constraint, and the criteria compose with
/// logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Keep only expenses filed under this category.
    pub category: Option<ExpenseCategory>,
    /// Keep only expenses dated within this month.
    pub month: Option<Month>,
    /// Keep only expenses dated within this year.
    pub year: Option<i32>,
}

/// Narrow `expenses` down to the entries matching `filter`.
///
/// A month criterion without a year is anchored to `reference_year`, so with
/// the current calendar year as the anchor a filter for March keeps March of
/// this year only. Expenses from a March in another year are excluded.
///
/// The input order is preserved. An empty result is a valid outcome, not an
/// error, and a filter window that falls outside the representable date range
/// matches nothing.
pub fn filter_expenses(
    expenses: Vec<Expense>,
    filter: &ExpenseFilter,
    reference_year: i32,
) -> Vec<Expense> {
    let window = date_window(filter, reference_year);

    expenses
        .into_iter()
        .filter(|expense| {
            filter
                .category
                .is_none_or(|category| expense.category == category)
                && window.contains(expense.date)
        })
        .collect()
}

/// The date constraint derived from a filter's month and year criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DateWindow {
    /// No month or year criteria were given.
    Unconstrained,
    /// Dates in `[start, end)` match.
    Between(Date, Date),
    /// The requested window cannot be represented, so no date matches.
    Empty,
}

impl DateWindow {
    fn contains(&self, date: Date) -> bool {
        match *self {
            DateWindow::Unconstrained => true,
            DateWindow::Between(start, end) => start <= date && date < end,
            DateWindow::Empty => false,
        }
    }
}

fn date_window(filter: &ExpenseFilter, reference_year: i32) -> DateWindow {
    match (filter.month, filter.year) {
        (None, None) => DateWindow::Unconstrained,
        (Some(month), year) => month_window(month, year.unwrap_or(reference_year)),
        (None, Some(year)) => year_window(year),
    }
}

fn month_window(month: Month, year: i32) -> DateWindow {
    // December rolls the end boundary into January of the following year.
    let end_year = if month == Month::December {
        year + 1
    } else {
        year
    };

    match (
        Date::from_calendar_date(year, month, 1),
        Date::from_calendar_date(end_year, month.next(), 1),
    ) {
        (Ok(start), Ok(end)) => DateWindow::Between(start, end),
        _ => DateWindow::Empty,
    }
}

fn year_window(year: i32) -> DateWindow {
    match (
        Date::from_calendar_date(year, Month::January, 1),
        Date::from_calendar_date(year + 1, Month::January, 1),
    ) {
        (Ok(start), Ok(end)) => DateWindow::Between(start, end),
        _ => DateWindow::Empty,
    }
}
