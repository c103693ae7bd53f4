//! Chart generation and rendering for the dashboard.
//!
//! This module creates interactive ECharts visualizations for the filtered
//! expense summary:
//! - **Monthly Expenses Chart**: Bar chart of expense totals per month
//! - **Expenses by Category Chart**: Pie chart of expense totals per category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization
//! code.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Label, Tooltip, Trigger,
    },
    series::{Bar, Pie},
};
use maud::PreEscaped;

use crate::{dashboard::aggregation::ExpenseSummary, html::HeadElement};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
///
/// # Arguments
/// * `charts` - The charts to generate initialization scripts for
///
/// # Returns
/// HeadElement containing the initialization JavaScript.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Bar chart of the summed expense amounts per month.
pub(super) fn monthly_expenses_chart(summary: &ExpenseSummary) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) =
        summary.monthly_totals.iter().cloned().unzip();

    Chart::new()
        .title(Title::new().text("Monthly Expenses"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Expenses").data(values))
}

/// Pie chart of the summed expense amounts per category, each slice labeled
/// with its name and share of the whole.
pub(super) fn category_chart(summary: &ExpenseSummary) -> Chart {
    let data = summary
        .category_totals
        .iter()
        .map(|(category, total)| (*total, category.as_label()))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Expenses by Category"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .series(
            Pie::new()
                .name("Expenses by Category")
                .radius("55%")
                .center(vec!["50%", "55%"])
                .label(Label::new().formatter("{b}: {d}%"))
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
