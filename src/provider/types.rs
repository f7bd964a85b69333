//! Wire types for the provider's transactions API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The provider's date format, e.g. "2025-01-15".
pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date string.
///
/// # Errors
/// Returns [Error::InvalidDate] if `text` is not a valid date.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(text.to_owned()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    // Every in-range `Date` can be written with this format description.
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// The errors that the provider client surfaces.
///
/// Each variant carries what the provider sent back, if anything, so callers
/// can report it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be sent or the response could not be read.
    #[error("could not reach the provider: {0}")]
    Network(String),

    /// The provider responded with a non-success status code.
    #[error("the provider responded with HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// The provider responded with a body that did not match the expected
    /// shape.
    #[error("could not parse the provider response ({reason}): {body}")]
    MalformedBody {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
        /// Why the body could not be parsed.
        reason: String,
    },

    /// The provider said there were more pages but gave no cursor to fetch
    /// them with.
    #[error("the provider reported more data but did not return a cursor")]
    MissingCursor,
}

impl ProviderError {
    /// The upstream HTTP status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } | ProviderError::MalformedBody { status, .. } => {
                Some(*status)
            }
            ProviderError::Network(_) | ProviderError::MissingCursor => None,
        }
    }

    /// The upstream response body, if a response was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            ProviderError::Status { body, .. } | ProviderError::MalformedBody { body, .. } => {
                Some(body)
            }
            ProviderError::Network(_) | ProviderError::MissingCursor => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Network(error.to_string())
    }
}

/// The provider's classification of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalFinanceCategory {
    /// The broad category, e.g. "FOOD_AND_DRINK".
    #[serde(default)]
    pub primary: Option<String>,
    /// The narrow category, e.g. "FOOD_AND_DRINK_COFFEE".
    #[serde(default)]
    pub detailed: Option<String>,
}

/// A transaction as the provider sends it.
///
/// Only the fields that are stored locally are named. Every other field is
/// kept in `extra` so historical loads can pass the provider's data through
/// untouched.
///
/// Named fields are read leniently: a null or wrongly typed value never
/// fails the page it arrived on. It is left empty here and rejected per
/// transaction by [crate::transaction::NewTransaction::from_raw].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// The provider's unique ID for the transaction.
    #[serde(default, deserialize_with = "lenient::string")]
    pub transaction_id: String,
    /// The provider's ID for the account the transaction belongs to.
    #[serde(default, deserialize_with = "lenient::string")]
    pub account_id: String,
    /// The signed amount of the transaction, if it was a number.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: Option<f64>,
    /// The provider's description of the transaction.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// When the transaction happened, as `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    /// The ISO 4217 currency code, e.g. "NZD".
    #[serde(default, deserialize_with = "lenient::optional")]
    pub iso_currency_code: Option<String>,
    /// The name of the merchant, if the provider could work it out.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub merchant_name: Option<String>,
    /// The provider's classification of the transaction.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
    /// Fields this crate does not use.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserializers that turn unexpected values into empty ones instead of
/// errors.
mod lenient {
    use serde::{Deserialize, Deserializer, de::DeserializeOwned};
    use serde_json::Value;

    /// Strings are kept, other scalars are written out as text and anything
    /// else becomes an empty string.
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        })
    }

    /// Numbers and numeric strings, `None` for anything else.
    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    /// `None` for null or a value that does not have the shape of `T`.
    pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;

        Ok(serde_json::from_value(value).ok())
    }
}

impl RawTransaction {
    /// Create a transaction with just the fields this crate uses.
    pub fn new(transaction_id: &str, amount: f64, date: &str, name: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_owned(),
            account_id: String::new(),
            amount: Some(amount),
            name: name.to_owned(),
            date: date.to_owned(),
            iso_currency_code: None,
            merchant_name: None,
            personal_finance_category: None,
            extra: Map::new(),
        }
    }
}

/// One page of changes from cursor mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPage {
    /// Transactions that are new since the request cursor.
    #[serde(default)]
    pub added: Vec<RawTransaction>,
    /// Whether there are more pages after this one.
    #[serde(default)]
    pub has_more: bool,
    /// The cursor to request the next page with.
    ///
    /// The provider may send an empty string, which is treated the same as no
    /// cursor.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl SyncPage {
    /// The next cursor, ignoring empty strings.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

/// One page of transactions from offset mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetPage {
    /// The transactions on this page.
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
    /// The number of transactions in the whole date range.
    #[serde(default)]
    pub total_transactions: usize,
}

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Create a date range from `start` to `end` (inclusive).
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `end` is before `start`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if end < start {
            return Err(Error::InvalidDateRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// The two years up to and including `today`.
    ///
    /// This is roughly the most history the provider will return.
    pub fn last_two_years(today: Date) -> Self {
        let start = today
            .replace_year(today.year() - 2)
            // 29 February has no counterpart two years earlier.
            .or_else(|_| {
                today
                    .previous_day()
                    .unwrap_or(today)
                    .replace_year(today.year() - 2)
            })
            .unwrap_or(Date::MIN);

        Self { start, end: today }
    }

    /// The first day of the range.
    pub fn start(&self) -> Date {
        self.start
    }

    /// The last day of the range.
    pub fn end(&self) -> Date {
        self.end
    }
}
