//! Reads the auth cookie issued by the session service and makes the caller's
//! user ID available to route handlers.

mod cookie;
mod middleware;
mod token;

pub use cookie::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, set_auth_cookie};
pub use middleware::{AuthState, auth_guard};
pub(crate) use token::Token;
