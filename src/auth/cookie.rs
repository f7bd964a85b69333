//! Defines functions for reading and writing the auth cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::Token, user::UserID};

/// The name of the cookie that holds the auth [Token].
pub const COOKIE_TOKEN: &str = "token";

/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Add an auth cookie for `user_id` to the cookie jar.
///
/// The cookie expires `duration` from now. This is how the session service
/// logs a user in, the sync service itself only reads the cookie.
///
/// # Errors
/// Returns an [Error::JSONSerializationError] if the token could not be
/// serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = Token::new(user_id, duration);
    let value = token.to_cookie_value()?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, value))
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Get the auth token from the cookie jar.
///
/// # Errors
/// This function will return a:
/// - [Error::CookieMissing] if there is no auth cookie, or it could not be
///   decrypted,
/// - [Error::InvalidToken] if the cookie does not hold a token or the token
///   has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token = Token::from_cookie_value(cookie.value_trimmed())?;

    if token.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::InvalidToken);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{
            COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, cookie::get_token_from_cookies,
            set_auth_cookie,
        },
        user::UserID,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");

        PrivateCookieJar::new(Key::from(&hash))
    }

    #[test]
    fn set_cookie_can_be_read_back() {
        let jar = set_auth_cookie(get_jar(), UserID::new(3), DEFAULT_COOKIE_DURATION).unwrap();

        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, UserID::new(3));
        assert!(
            (token.expires_at - (OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION)).abs()
                < Duration::seconds(1)
        );
    }

    #[test]
    fn cookie_is_locked_down() {
        let jar = set_auth_cookie(get_jar(), UserID::new(3), DEFAULT_COOKIE_DURATION).unwrap();

        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn missing_cookie() {
        assert_eq!(get_token_from_cookies(&get_jar()), Err(Error::CookieMissing));
    }

    #[test]
    fn expired_cookie_is_rejected() {
        let jar = set_auth_cookie(get_jar(), UserID::new(3), Duration::seconds(-1)).unwrap();

        assert_eq!(get_token_from_cookies(&jar), Err(Error::InvalidToken));
    }

    #[test]
    fn cookie_without_token_is_rejected() {
        let jar = get_jar().add(Cookie::new(COOKIE_TOKEN, "FOOBAR"));

        assert_eq!(get_token_from_cookies(&jar), Err(Error::InvalidToken));
    }
}
