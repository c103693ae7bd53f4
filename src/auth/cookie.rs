//! Defines functions for handling user authentication with cookies.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{Error, user::UserID};

use super::token::Token;

/// The name of the cookie that holds the serialized auth token.
pub const COOKIE_TOKEN: &str = "token";

/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the expiry of the cookie to `duration` from the current time, recorded
/// in the timezone given by `local_offset`.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
///
/// Returns an [Error::JSONSerializationError] if the auth token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = (OffsetDateTime::now_utc() + duration).to_offset(local_offset);

    build_auth_cookie(jar, user_id, expires_at)
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the deserialized auth token from the cookie jar.
///
/// # Errors
///
/// Returns an:
/// - [Error::CookieMissing] if the token cookie is not in the cookie jar.
/// - [Error::InvalidCredentials] if the token cannot be parsed or has expired.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let token_cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token = serde_json::from_str(token_cookie.value_trimmed())
        .map_err(|_| Error::InvalidCredentials)?;

    if token.expires_at <= OffsetDateTime::now_utc() {
        return Err(Error::InvalidCredentials);
    }

    Ok(token)
}

/// Push the expiry of the auth cookie in `jar` out to `duration` from the
/// current time, unless the token already expires later than that.
///
/// Leaving later expiries alone means a "remember me" session is not cut short
/// by this function.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns an:
/// - [Error::CookieMissing] if the token cookie is not in the cookie jar.
/// - [Error::InvalidCredentials] if the token cannot be parsed or has expired.
/// - [Error::InvalidDateFormat] if extending the expiry by `duration` would overflow the date time.
pub fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;

    let minimum_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| {
            Error::InvalidDateFormat(
                "datetime overflow".to_owned(),
                token.expires_at.to_string(),
            )
        })?
        .to_offset(local_offset);

    if token.expires_at >= minimum_expiry {
        return Ok(jar);
    }

    build_auth_cookie(jar, token.user_id, minimum_expiry)
}

fn build_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    expires_at: OffsetDateTime,
) -> Result<PrivateCookieJar, Error> {
    let token = Token {
        user_id,
        expires_at,
    };
    let token_string = serde_json::to_string(&token)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}
