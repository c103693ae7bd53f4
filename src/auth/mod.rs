mod cookie;
mod forgot_password;
mod log_in;
mod middleware;
mod redirect;
mod token;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use forgot_password::get_forgot_password_page;
pub use log_in::{get_log_in_page, post_log_in};
pub use middleware::{auth_guard, auth_guard_hx};
pub use redirect::normalize_redirect_url;

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;

#[cfg(test)]
pub use middleware::AuthState;
