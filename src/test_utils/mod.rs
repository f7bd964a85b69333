#![allow(missing_docs)]

mod provider;

pub(crate) use provider::{FakeProvider, raw_transaction, sync_page};

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    db::initialize,
    provider::ProviderCredential,
    user::{User, get_or_create_user, set_provider_credential},
};

pub(crate) fn get_test_connection() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    initialize(&conn).unwrap();

    Arc::new(Mutex::new(conn))
}

/// Create a user with `access_token` linked as their provider credential.
pub(crate) fn must_create_linked_user(
    username: &str,
    access_token: &str,
    connection: &Mutex<Connection>,
) -> User {
    let connection = connection.lock().unwrap();
    let user = get_or_create_user(username, &connection).expect("Could not create user");
    let credential = ProviderCredential::new(access_token).unwrap();
    set_provider_credential(user.id, Some(&credential), &connection)
        .expect("Could not link credential");

    user
}
