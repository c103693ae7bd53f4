//! Dashboard module for the expense tracking application.
//!
//! Provides the dashboard page that summarizes the user's spending with a
//! filterable total, charts and an expense table with edit and delete
//! actions.

mod aggregation;
mod charts;
mod handlers;
mod tables;

pub use handlers::get_dashboard_page;
