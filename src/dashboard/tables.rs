//! Builds the expense table shown below the dashboard charts.

use maud::{Markup, html};
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    category::ExpenseCategory,
    endpoints::{self, format_endpoint},
    expense::Expense,
    html::{
        CATEGORY_BADGE_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        edit_delete_action_links, format_currency,
    },
};

/// The max number of graphemes to display in the description column of the
/// expense table rows before truncating and displaying ellipses.
const MAX_DESCRIPTION_GRAPHEMES: usize = 32;

/// A row of the dashboard expense table with its action URLs already built.
pub(super) struct ExpenseTableRow {
    pub date: Date,
    pub description: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    /// The URL of the edit page for this expense.
    pub edit_url: String,
    /// The URL to send a DELETE request to for this expense.
    pub delete_url: String,
}

impl ExpenseTableRow {
    /// Create a table row for `expense`.
    ///
    /// `redirect_param` is a URL-encoded `redirect_url` query string to append
    /// to the edit URL so that saving the edit form sends the user back to the
    /// dashboard view they came from.
    pub fn new_from_expense(expense: Expense, redirect_param: Option<&str>) -> Self {
        let mut edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);

        if let Some(param) = redirect_param {
            edit_url = format!("{edit_url}?{param}");
        }

        let delete_url = format_endpoint(endpoints::EXPENSE_API, expense.id);

        Self {
            date: expense.date,
            description: expense.description,
            category: expense.category,
            amount: expense.amount,
            edit_url,
            delete_url,
        }
    }
}

/// Renders the expense table.
///
/// Shows an empty state row when `rows` is empty so the table does not
/// collapse to a bare header.
pub(super) fn expense_table(rows: &[ExpenseTableRow]) -> Markup {
    html! {
        section class="rounded bg-gray-50 dark:bg-gray-800 overflow-hidden lg:max-w-5xl lg:w-full lg:mx-auto"
        {
            div class="relative overflow-x-auto"
            {
                table class="w-full my-2 text-sm text-left rtl:text-right
                    text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                "Date"
                            }
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                "Description"
                            }
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                "Category"
                            }
                            th scope="col" class="px-6 py-3 text-right"
                            {
                                "Amount"
                            }
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                "Actions"
                            }
                        }
                    }

                    tbody
                    {
                        @for row in rows {
                            (expense_row_view(row))
                        }

                        @if rows.is_empty() {
                            tr
                            {
                                td
                                    colspan="5"
                                    data-empty-state="true"
                                    class="px-6 py-4 text-center"
                                {
                                    "No expenses to show."
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn expense_row_view(row: &ExpenseTableRow) -> Markup {
    let amount_str = format_currency(row.amount);
    let (description, tooltip) = format_description(&row.description);
    let confirm_message = format!(
        "Are you sure you want to delete the expense '{}'? This cannot be undone.",
        row.description
    );

    html! {
        tr class=(TABLE_ROW_STYLE) data-expense-row="true"
        {
            td class=(TABLE_CELL_STYLE) { (row.date) }
            td class=(TABLE_CELL_STYLE) title=[tooltip] { (description) }
            td class=(TABLE_CELL_STYLE)
            {
                span class=(CATEGORY_BADGE_STYLE)
                {
                    (row.category)
                }
            }
            td class="px-6 py-4 text-right" { (amount_str) }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    (edit_delete_action_links(
                        &row.edit_url,
                        &row.delete_url,
                        &confirm_message,
                        "closest tr",
                        "delete",
                    ))
                }
            }
        }
    }
}

fn format_description(description: &str) -> (String, Option<&str>) {
    let description_length = description.graphemes(true).count();

    if description_length <= MAX_DESCRIPTION_GRAPHEMES {
        (description.to_owned(), None)
    } else {
        let truncated: String = description
            .graphemes(true)
            .take(MAX_DESCRIPTION_GRAPHEMES - 3)
            .collect();
        let truncated = truncated + "...";
        (truncated, Some(description))
    }
}

#[cfg(test)]
mod table_tests {
    use time::macros::date;
    use unicode_segmentation::UnicodeSegmentation;

    use crate::{category::ExpenseCategory, expense::Expense, user::UserID};

    use super::{
        ExpenseTableRow, MAX_DESCRIPTION_GRAPHEMES, expense_table, format_description,
    };

    fn create_test_expense(description: &str) -> Expense {
        Expense {
            id: 7,
            amount: 19.99,
            date: date!(2024 - 03 - 05),
            description: description.to_owned(),
            category: ExpenseCategory::Leisure,
            user_id: UserID::new(1),
        }
    }

    #[test]
    fn row_urls_point_at_expense_routes() {
        let row = ExpenseTableRow::new_from_expense(create_test_expense("movie tickets"), None);

        assert_eq!(row.edit_url, "/expenses/7/edit");
        assert_eq!(row.delete_url, "/api/expenses/7");
    }

    #[test]
    fn row_edit_url_appends_redirect_param() {
        let row = ExpenseTableRow::new_from_expense(
            create_test_expense("movie tickets"),
            Some("redirect_url=%2Fdashboard%3Fmonth%3D3"),
        );

        assert_eq!(
            row.edit_url,
            "/expenses/7/edit?redirect_url=%2Fdashboard%3Fmonth%3D3"
        );
        // The redirect URL only affects the edit page, not the delete request.
        assert_eq!(row.delete_url, "/api/expenses/7");
    }

    #[test]
    fn short_description_is_untouched() {
        let description = "a".repeat(MAX_DESCRIPTION_GRAPHEMES);

        let (displayed, tooltip) = format_description(&description);

        assert_eq!(displayed, description);
        assert_eq!(tooltip, None);
    }

    #[test]
    fn long_description_is_truncated_with_tooltip() {
        let description = "a".repeat(MAX_DESCRIPTION_GRAPHEMES + 1);

        let (displayed, tooltip) = format_description(&description);

        assert_eq!(
            displayed.graphemes(true).count(),
            MAX_DESCRIPTION_GRAPHEMES
        );
        assert!(displayed.ends_with("..."));
        assert_eq!(tooltip, Some(description.as_str()));
    }

    #[test]
    fn truncation_counts_graphemes_not_bytes() {
        // Each flag emoji is one grapheme but eight bytes.
        let description = "🇳🇿".repeat(MAX_DESCRIPTION_GRAPHEMES);

        let (displayed, tooltip) = format_description(&description);

        assert_eq!(displayed, description);
        assert_eq!(tooltip, None);
    }

    #[test]
    fn empty_table_renders_empty_state_row() {
        let html = expense_table(&[]).into_string();

        assert!(html.contains("data-empty-state=\"true\""), "{html}");
        assert!(html.contains("No expenses to show."), "{html}");
    }

    #[test]
    fn table_renders_confirm_message_with_description() {
        let row = ExpenseTableRow::new_from_expense(create_test_expense("movie tickets"), None);

        let html = expense_table(&[row]).into_string();

        assert!(
            html.contains(
                "Are you sure you want to delete the expense 'movie tickets'? This cannot be undone."
            ),
            "{html}"
        );
    }
}
