//! Defines the cursor store trait.

use crate::Error;

/// Durably maps a provider session to the last cursor that was fully processed.
pub trait CursorStore {
    /// Get the cursor to resume `session_key` from.
    ///
    /// Returns `None` for a session that has never been synced.
    fn load_cursor(&self, session_key: &str) -> Result<Option<String>, Error>;

    /// Record `continuation_token` as the cursor to resume `session_key` from.
    ///
    /// The write must be atomic.
    fn save_cursor(&self, session_key: &str, continuation_token: Option<&str>)
    -> Result<(), Error>;
}
