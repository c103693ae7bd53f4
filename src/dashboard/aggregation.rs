//! Expense aggregation for the dashboard charts.
//!
//! Provides the summary that backs the dashboard: the filtered total plus
//! per-category and per-month series in a chart-ready shape.

use time::{Date, Month};

use crate::{Error, category::ExpenseCategory, expense::Expense};

/// The aggregated view of a filtered expense collection.
#[derive(Debug, PartialEq)]
pub(super) struct ExpenseSummary {
    /// The sum of all amounts in the collection.
    pub total: f64,
    /// Total amount per category, in first-seen order.
    pub category_totals: Vec<(ExpenseCategory, f64)>,
    /// Total amount per "Month Year" label (e.g. "March 2024"), in first-seen
    /// order.
    pub monthly_totals: Vec<(String, f64)>,
}

/// Aggregates `expenses` into category and monthly totals.
///
/// The series keep the order the groups are first seen in, which follows the
/// ordering of the input collection.
///
/// # Errors
///
/// Returns [Error::NoDataToAggregate] if `expenses` is empty. Callers render
/// a "no data" notice instead of empty charts.
pub(super) fn summarize(expenses: &[Expense]) -> Result<ExpenseSummary, Error> {
    if expenses.is_empty() {
        return Err(Error::NoDataToAggregate);
    }

    let mut total = 0.0;
    let mut category_totals: Vec<(ExpenseCategory, f64)> = Vec::new();
    let mut monthly_totals: Vec<(String, f64)> = Vec::new();

    for expense in expenses {
        total += expense.amount;
        add_to_series(&mut category_totals, expense.category, expense.amount);
        add_to_series(&mut monthly_totals, month_label(expense.date), expense.amount);
    }

    Ok(ExpenseSummary {
        total,
        category_totals,
        monthly_totals,
    })
}

fn add_to_series<K: PartialEq>(series: &mut Vec<(K, f64)>, key: K, amount: f64) {
    match series.iter_mut().find(|(existing, _)| *existing == key) {
        Some((_, sum)) => *sum += amount,
        None => series.push((key, amount)),
    }
}

/// Formats a date as a "Month Year" group label, e.g. "March 2024".
pub(super) fn month_label(date: Date) -> String {
    format!("{} {}", month_name(date.month()), date.year())
}

/// The full English month name.
pub(super) fn month_name(month: Month) -> &'static str {
    match month {
        Month::January => "January",
        Month::February => "February",
        Month::March => "March",
        Month::April => "April",
        Month::May => "May",
        Month::June => "June",
        Month::July => "July",
        Month::August => "August",
        Month::September => "September",
        Month::October => "October",
        Month::November => "November",
        Month::December => "December",
    }
}
