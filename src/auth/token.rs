//! The token stored in the auth cookie.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserID};

mod expiry_format {
    //! Writes the expiry with a fixed width hour so that times around
    //! midnight survive a round trip through the cookie.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const EXPIRY_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(expires_at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = expires_at
            .format(EXPIRY_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Who the caller is and until when the session service vouches for them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    /// The user the cookie was issued to.
    pub user_id: UserID,

    /// When the cookie stops being accepted.
    #[serde(with = "expiry_format")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Create a token for `user_id` that is valid for `duration` from now.
    pub fn new(user_id: UserID, duration: Duration) -> Self {
        Self {
            user_id,
            expires_at: OffsetDateTime::now_utc() + duration,
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Serialize the token as the value of the auth cookie.
    ///
    /// # Errors
    /// Returns an [Error::JSONSerializationError] if the token could not be
    /// serialized.
    pub fn to_cookie_value(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|error| Error::JSONSerializationError(error.to_string()))
    }

    /// Parse the value of the auth cookie.
    ///
    /// # Errors
    /// Returns an [Error::InvalidToken] if `value` is not a serialized token.
    pub fn from_cookie_value(value: &str) -> Result<Self, Error> {
        serde_json::from_str(value).map_err(|_| Error::InvalidToken)
    }
}
