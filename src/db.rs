//! Sets up the application's SQLite database.

use rusqlite::Connection;

use crate::{
    Error, cursor::create_cursor_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the tables for the domain models.
///
/// Tables are created inside a single SQL transaction and only if they do not
/// already exist, so calling this on an existing database is safe.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_cursor_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(initialize(&conn), Ok(()));
        assert_eq!(initialize(&conn), Ok(()));
    }

    #[test]
    fn creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let mut tables: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|name| name.unwrap())
            .collect();
        tables.sort();

        assert_eq!(tables, ["provider_cursor", "transaction", "user"]);
    }
}
