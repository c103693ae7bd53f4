//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - The route handler for displaying the dashboard
//! - The filter form parsing that narrows down which expenses are shown
//! - HTML view functions for rendering the dashboard UI

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Month, OffsetDateTime};

use crate::{
    AppState, Error,
    category::ExpenseCategory,
    endpoints,
    expense::{ExpenseFilter, filter_expenses, get_expenses_for_user},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, base,
        currency_rounded_with_tooltip, link,
    },
    navigation::NavBar,
    timezone::get_local_offset,
    user::UserID,
};

use super::{
    aggregation::{ExpenseSummary, month_name, summarize},
    charts::{DashboardChart, category_chart, charts_script, monthly_expenses_chart},
    tables::{ExpenseTableRow, expense_table},
};

/// The drop-down option label that leaves a filter criterion unconstrained.
const ALL_OPTION: &str = "All";

/// How many years before the current year appear in the year filter options.
const YEAR_SPAN: i32 = 6;

/// Calendar order for the month filter drop-down.
const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// The state needed for displaying the dashboard page.
///
/// Contains the database connection and timezone information required
/// by the dashboard handler.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the user's expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The raw query string of the dashboard filter form.
///
/// The fields are strings rather than typed values because the form always
/// submits every drop-down, including the "All" placeholder options, and an
/// unparseable value should fall back to no criterion instead of rejecting
/// the request.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The selected category label, or "All".
    category: Option<String>,
    /// The selected month as its calendar number, or "All".
    month: Option<String>,
    /// The selected year, or "All".
    year: Option<String>,
}

/// Display a page with an overview of the user's spending.
///
/// The query string narrows the view down by category, month and year. The
/// filtered expenses feed the total, the charts and the expense table.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW);

    let expenses = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_expenses_for_user(user_id, &connection).inspect_err(|error| {
            tracing::error!("could not get expenses for user {user_id}: {error}")
        })?
    };

    if expenses.is_empty() {
        return Ok(dashboard_no_data_view(nav_bar).into_response());
    }

    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let current_year = OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .date()
        .year();

    let filter = filter_from_query(&query);
    let filtered_expenses = filter_expenses(expenses, &filter, current_year);

    let (total, charts) = match summarize(&filtered_expenses) {
        Ok(summary) => (summary.total, Some(build_dashboard_charts(&summary))),
        // The user's filter matched nothing, show a notice instead of charts.
        Err(Error::NoDataToAggregate) => (0.0, None),
        Err(error) => return Err(error),
    };

    let redirect_url = dashboard_url(&filter);
    let redirect_param = build_redirect_param(&redirect_url);
    let rows: Vec<ExpenseTableRow> = filtered_expenses
        .into_iter()
        .map(|expense| ExpenseTableRow::new_from_expense(expense, redirect_param.as_deref()))
        .collect();

    let year_options: Vec<i32> = (0..=YEAR_SPAN).map(|offset| current_year - offset).collect();

    Ok(
        dashboard_view(nav_bar, &filter, &year_options, total, charts.as_ref(), &rows)
            .into_response(),
    )
}

/// Convert the raw filter form query into filter criteria.
///
/// Missing, empty, "All" and unparseable values all mean no criterion.
fn filter_from_query(query: &DashboardQuery) -> ExpenseFilter {
    ExpenseFilter {
        category: criterion_value(query.category.as_deref()).and_then(parse_category),
        month: criterion_value(query.month.as_deref()).and_then(parse_month),
        year: criterion_value(query.year.as_deref()).and_then(parse_year),
    }
}

fn criterion_value(raw: Option<&str>) -> Option<&str> {
    match raw {
        None => None,
        Some(value) if value.is_empty() || value == ALL_OPTION => None,
        Some(value) => Some(value),
    }
}

fn parse_category(raw: &str) -> Option<ExpenseCategory> {
    raw.parse()
        .inspect_err(|_| tracing::warn!("Ignoring unknown category filter {raw:?}"))
        .ok()
}

fn parse_month(raw: &str) -> Option<Month> {
    let month = raw
        .parse::<u8>()
        .ok()
        .and_then(|number| Month::try_from(number).ok());

    if month.is_none() {
        tracing::warn!("Ignoring invalid month filter {raw:?}");
    }

    month
}

fn parse_year(raw: &str) -> Option<i32> {
    match raw.parse() {
        Ok(year) => Some(year),
        Err(error) => {
            tracing::warn!("Ignoring invalid year filter {raw:?}: {error}");
            None
        }
    }
}

/// Creates the pair of dashboard charts from the expense summary.
///
/// The chart options are serialized to JSON for ECharts consumption.
fn build_dashboard_charts(summary: &ExpenseSummary) -> [DashboardChart; 2] {
    [
        DashboardChart {
            id: "monthly-expenses-chart",
            options: monthly_expenses_chart(summary).to_string(),
        },
        DashboardChart {
            id: "expenses-by-category-chart",
            options: category_chart(summary).to_string(),
        },
    ]
}

/// Rebuild the dashboard URL for `filter`.
///
/// The edit links in the expense table carry this URL so that saving an edit
/// sends the user back to the same filtered view.
fn dashboard_url(filter: &ExpenseFilter) -> String {
    let mut query_pairs: Vec<(&str, String)> = Vec::new();

    if let Some(category) = filter.category {
        query_pairs.push(("category", category.as_label().to_owned()));
    }

    if let Some(month) = filter.month {
        query_pairs.push(("month", u8::from(month).to_string()));
    }

    if let Some(year) = filter.year {
        query_pairs.push(("year", year.to_string()));
    }

    if query_pairs.is_empty() {
        return endpoints::DASHBOARD_VIEW.to_owned();
    }

    match serde_urlencoded::to_string(&query_pairs) {
        Ok(query_string) => format!("{}?{query_string}", endpoints::DASHBOARD_VIEW),
        Err(error) => {
            tracing::error!("Could not encode dashboard filter query: {error}");
            endpoints::DASHBOARD_VIEW.to_owned()
        }
    }
}

fn build_redirect_param(redirect_url: &str) -> Option<String> {
    serde_urlencoded::to_string([("redirect_url", &redirect_url)])
        .inspect_err(|error| {
            tracing::error!(
                "Could not set redirect URL {redirect_url} due to encoding error: {error}"
            );
        })
        .ok()
}

/// Renders the dashboard page when the user has not recorded any expenses.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_expense_link = link(endpoints::NEW_EXPENSE_VIEW, "recording an expense");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you start tracking your
                spending. Get started by " (new_expense_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the main dashboard page with the filter form, the filtered total,
/// charts and the expense table.
///
/// `charts` is [None] when the filter matched no expenses, in which case a
/// notice is shown in place of the chart grid.
fn dashboard_view(
    nav_bar: NavBar,
    filter: &ExpenseFilter,
    year_options: &[i32],
    total: f64,
    charts: Option<&[DashboardChart; 2]>,
    rows: &[ExpenseTableRow],
) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (filter_form(filter, year_options))

            section class="w-full mx-auto mb-4 flex items-baseline gap-2"
            {
                h3 class="text-xl font-semibold" { "Total" }

                span class="text-xl" { (currency_rounded_with_tooltip(total)) }
            }

            @if let Some(charts) = charts {
                section
                    id="charts"
                    class="w-full mx-auto mb-4"
                {
                    div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
                    {
                        @for chart in charts {
                            div
                                id=(chart.id)
                                class="min-h-[380px] rounded dark:bg-gray-100"
                            {}
                        }
                    }
                }
            } @else {
                p
                    data-no-data-notice="true"
                    class="mb-4 text-gray-600 dark:text-gray-400"
                {
                    "There is no data for the filter you selected!"
                }
            }

            (expense_table(rows))
        }
    );

    let scripts = match charts {
        Some(charts) => vec![
            HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
            charts_script(charts),
        ],
        None => Vec::new(),
    };

    base("Dashboard", &scripts, &content)
}

/// The filter form with category, month and year drop-downs.
///
/// Submitting the form reloads the dashboard with the selection in the query
/// string, so filtered views are bookmarkable.
fn filter_form(filter: &ExpenseFilter, year_options: &[i32]) -> Markup {
    html!(
        form
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            class="w-full mx-auto mb-4 grid grid-cols-2 gap-4 items-end
                bg-gray-50 dark:bg-gray-800 p-4 rounded-lg sm:grid-cols-4"
        {
            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value=(ALL_OPTION) selected[filter.category.is_none()]
                    {
                        (ALL_OPTION)
                    }

                    @for category in ExpenseCategory::ALL {
                        option
                            value=(category)
                            selected[filter.category == Some(category)]
                        {
                            (category)
                        }
                    }
                }
            }

            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                select name="month" id="month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value=(ALL_OPTION) selected[filter.month.is_none()]
                    {
                        (ALL_OPTION)
                    }

                    @for month in MONTHS {
                        option
                            value=(u8::from(month))
                            selected[filter.month == Some(month)]
                        {
                            (month_name(month))
                        }
                    }
                }
            }

            div
            {
                label for="year" class=(FORM_LABEL_STYLE) { "Year" }

                select name="year" id="year" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value=(ALL_OPTION) selected[filter.year.is_none()]
                    {
                        (ALL_OPTION)
                    }

                    @for year in year_options {
                        option
                            value=(year)
                            selected[filter.year == Some(*year)]
                        {
                            (year)
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                "Apply"
            }
        }
    )
}
