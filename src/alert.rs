//! Success and error alerts swapped into the page's alert container via HTMX.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

const SUCCESS_STYLE: &str =
    "p-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400";

const ERROR_STYLE: &str =
    "p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400";

/// An alert message to display to the user.
///
/// Alerts render as an out-of-band swap targeting the alert container in the
/// base page layout, so a partial response can update the alert area no
/// matter which element the triggering form targeted.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// Something worked.
    Success { message: String },
    /// Something failed, with extra detail text.
    Error { message: String, details: String },
}

impl Alert {
    /// Render the alert into the out-of-band alert container.
    pub fn into_html(self) -> Markup {
        let (style, message, details) = match self {
            Alert::Success { message } => (SUCCESS_STYLE, message, None),
            Alert::Error { message, details } => (ERROR_STYLE, message, Some(details)),
        };

        html! {
            div id="alert-container" hx-swap-oob="true"
            {
                div class=(style) role="alert"
                {
                    p class="font-medium" { (message) }

                    @if let Some(details) = details {
                        p { (details) }
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use scraper::{Html, Selector};

    use super::Alert;

    #[test]
    fn renders_message_in_first_paragraph() {
        let alert = Alert::Error {
            message: "Could not delete expense".to_owned(),
            details: "The expense could not be found.".to_owned(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        let p = Selector::parse("p").unwrap();
        let first_paragraph = html
            .select(&p)
            .next()
            .expect("alert should contain a message paragraph")
            .text()
            .collect::<String>();
        assert_eq!(first_paragraph.trim(), "Could not delete expense");
    }

    #[test]
    fn renders_into_alert_container() {
        let alert = Alert::Success {
            message: "Expense deleted".to_owned(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        let container = Selector::parse("div#alert-container[hx-swap-oob=true]").unwrap();
        assert!(
            html.select(&container).next().is_some(),
            "alert should swap into #alert-container"
        );

        let role = Selector::parse("div[role=alert]").unwrap();
        assert!(html.select(&role).next().is_some());
    }

    #[test]
    fn success_alerts_have_no_details_paragraph() {
        let alert = Alert::Success {
            message: "Expense deleted.".to_owned(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        let p = Selector::parse("p").unwrap();
        assert_eq!(html.select(&p).count(), 1);
    }
}
