//! Defines the core data models and database queries for transactions synced
//! from the provider.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    provider::{DATE_FORMAT, RawTransaction},
    user::UserID,
};

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income that was pulled from the provider and stored locally.
///
/// To create a new `TransactionRecord`, build a [NewTransaction] and pass it to
/// [insert_transaction_if_absent].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The local ID of the transaction.
    pub id: DatabaseId,
    /// The provider's ID for the transaction. Unique across the store.
    pub external_id: String,
    /// The provider's ID for the account the transaction belongs to.
    pub account_id: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The broad category assigned by the provider.
    pub category: Option<String>,
    /// The narrow category assigned by the provider.
    pub subcategory: Option<String>,
    /// When the transaction happened.
    pub occurred_on: Date,
    /// The ISO 4217 currency code.
    pub currency_code: Option<String>,
    /// The name of the merchant.
    pub merchant_name: Option<String>,
    /// The user the transaction was synced for.
    pub owner_user_id: Option<UserID>,
}

/// A transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The provider's ID for the transaction.
    pub external_id: String,
    /// The provider's ID for the account the transaction belongs to.
    pub account_id: String,
    /// The monetary amount of the transaction.
    ///
    /// The sign follows the provider's convention.
    pub amount: f64,
    /// A human-readable description of the transaction.
    pub description: String,
    /// The broad category assigned by the provider, e.g. "FOOD_AND_DRINK".
    pub category: Option<String>,
    /// The narrow category assigned by the provider, e.g. "FOOD_AND_DRINK_COFFEE".
    pub subcategory: Option<String>,
    /// The date when the transaction occurred.
    pub occurred_on: Date,
    /// The ISO 4217 currency code.
    pub currency_code: Option<String>,
    /// The name of the merchant.
    pub merchant_name: Option<String>,
    /// The user the transaction belongs to, if the sync was for a user.
    pub owner_user_id: Option<UserID>,
}

impl NewTransaction {
    /// Map a transaction from the provider to one that can be stored.
    ///
    /// # Errors
    /// Returns an [Error::RecordFormat] if the transaction has no ID, no
    /// numeric amount, or its date is not a valid `YYYY-MM-DD` date.
    pub fn from_raw(raw: &RawTransaction, owner_user_id: Option<UserID>) -> Result<Self, Error> {
        let external_id = raw.transaction_id.trim();

        if external_id.is_empty() {
            return Err(Error::RecordFormat {
                external_id: String::new(),
                reason: "the transaction has no transaction_id".to_owned(),
            });
        }

        let occurred_on =
            Date::parse(raw.date.trim(), DATE_FORMAT).map_err(|error| Error::RecordFormat {
                external_id: external_id.to_owned(),
                reason: format!("could not parse date \"{}\": {error}", raw.date),
            })?;

        let amount = raw.amount.ok_or_else(|| Error::RecordFormat {
            external_id: external_id.to_owned(),
            reason: "the transaction has no numeric amount".to_owned(),
        })?;

        let (category, subcategory) = raw
            .personal_finance_category
            .as_ref()
            .map(|category| (category.primary.clone(), category.detailed.clone()))
            .unwrap_or_default();

        Ok(Self {
            external_id: external_id.to_owned(),
            account_id: raw.account_id.clone(),
            amount,
            description: raw.name.clone(),
            category,
            subcategory,
            occurred_on,
            currency_code: raw.iso_currency_code.clone(),
            merchant_name: raw.merchant_name.clone(),
            owner_user_id,
        })
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert a transaction unless one with the same external ID is already stored.
///
/// Returns `true` if the transaction was inserted and `false` if it was
/// already stored. An existing transaction is never modified.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidUser] if the owner does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction_if_absent(
    transaction: &NewTransaction,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_inserted = connection
        .prepare_cached(
            "INSERT INTO \"transaction\" (external_id, account_id, amount, description, \
             category, subcategory, occurred_on, currency_code, merchant_name, owner_user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(external_id) DO NOTHING",
        )?
        .execute((
            &transaction.external_id,
            &transaction.account_id,
            transaction.amount,
            &transaction.description,
            &transaction.category,
            &transaction.subcategory,
            transaction.occurred_on,
            &transaction.currency_code,
            &transaction.merchant_name,
            transaction.owner_user_id.map(|user_id| user_id.as_i64()),
        ))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidUser,
            error => error.into(),
        })?;

    Ok(rows_inserted == 1)
}

/// Check whether a transaction with `external_id` is stored.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn transaction_exists(external_id: &str, connection: &Connection) -> Result<bool, Error> {
    connection
        .prepare_cached("SELECT EXISTS(SELECT 1 FROM \"transaction\" WHERE external_id = ?1)")?
        .query_row((external_id,), |row| row.get(0))
        .map_err(|error| error.into())
}

/// Retrieve the transactions that were synced for `user_id`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(
            "SELECT id, external_id, account_id, amount, description, category, subcategory, \
             occurred_on, currency_code, merchant_name, owner_user_id
             FROM \"transaction\" WHERE owner_user_id = :user_id
             ORDER BY occurred_on ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every stored transaction, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(
            "SELECT id, external_id, account_id, amount, description, category, subcategory, \
             occurred_on, currency_code, merchant_name, owner_user_id
             FROM \"transaction\"
             ORDER BY occurred_on ASC, id ASC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL UNIQUE,
                account_id TEXT NOT NULL,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                category TEXT,
                subcategory TEXT,
                occurred_on TEXT NOT NULL,
                currency_code TEXT,
                merchant_name TEXT,
                owner_user_id INTEGER,
                FOREIGN KEY(owner_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Used by the per-user listing.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_date
         ON \"transaction\"(owner_user_id, occurred_on);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [TransactionRecord].
pub fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    let owner_user_id: Option<i64> = row.get(10)?;

    Ok(TransactionRecord {
        id: row.get(0)?,
        external_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        subcategory: row.get(6)?,
        occurred_on: row.get(7)?,
        currency_code: row.get(8)?,
        merchant_name: row.get(9)?,
        owner_user_id: owner_user_id.map(UserID::new),
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        transaction::{
            NewTransaction, count_transactions, get_all_transactions, get_transactions_for_user,
            insert_transaction_if_absent, transaction_exists,
        },
        user::{UserID, get_or_create_user},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn new_transaction(external_id: &str, owner_user_id: Option<UserID>) -> NewTransaction {
        NewTransaction {
            external_id: external_id.to_owned(),
            account_id: "acc1".to_owned(),
            amount: 12.3,
            description: "Lunch".to_owned(),
            category: None,
            subcategory: None,
            occurred_on: date!(2025 - 10 - 05),
            currency_code: Some("NZD".to_owned()),
            merchant_name: None,
            owner_user_id,
        }
    }

    #[test]
    fn insert_succeeds() {
        let conn = get_test_connection();

        let inserted = insert_transaction_if_absent(&new_transaction("t1", None), &conn);

        assert_eq!(inserted, Ok(true));
        assert_eq!(transaction_exists("t1", &conn), Ok(true));
    }

    #[test]
    fn insert_of_duplicate_external_id_is_a_no_op() {
        let conn = get_test_connection();
        insert_transaction_if_absent(&new_transaction("t1", None), &conn).unwrap();
        let mut changed = new_transaction("t1", None);
        changed.amount = 99.0;

        let inserted = insert_transaction_if_absent(&changed, &conn);

        assert_eq!(inserted, Ok(false));
        assert_eq!(count_transactions(&conn), Ok(1));
        let stored = get_all_transactions(&conn).unwrap();
        assert_eq!(stored[0].amount, 12.3, "existing transaction must not change");
    }

    #[test]
    fn insert_fails_on_invalid_owner() {
        let conn = get_test_connection();

        let result =
            insert_transaction_if_absent(&new_transaction("t1", Some(UserID::new(42))), &conn);

        assert_eq!(result, Err(Error::InvalidUser));
    }

    #[test]
    fn exists_is_false_for_unknown_id() {
        let conn = get_test_connection();

        assert_eq!(transaction_exists("nope", &conn), Ok(false));
    }

    #[test]
    fn get_for_user_only_returns_their_transactions() {
        let conn = get_test_connection();
        let alice = get_or_create_user("alice", &conn).unwrap();
        let bob = get_or_create_user("bob", &conn).unwrap();
        insert_transaction_if_absent(&new_transaction("t1", Some(alice.id)), &conn).unwrap();
        insert_transaction_if_absent(&new_transaction("t2", Some(bob.id)), &conn).unwrap();
        insert_transaction_if_absent(&new_transaction("t3", Some(alice.id)), &conn).unwrap();

        let got = get_transactions_for_user(alice.id, &conn).unwrap();

        let ids: Vec<&str> = got.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, ["t1", "t3"]);
        assert!(got.iter().all(|t| t.owner_user_id == Some(alice.id)));
    }

    #[test]
    fn stored_fields_round_trip() {
        let conn = get_test_connection();
        let want = new_transaction("t1", None);
        insert_transaction_if_absent(&want, &conn).unwrap();

        let got = get_all_transactions(&conn).unwrap().remove(0);

        assert_eq!(got.external_id, want.external_id);
        assert_eq!(got.occurred_on, want.occurred_on);
        assert_eq!(got.currency_code, want.currency_code);
        assert_eq!(got.owner_user_id, None);
    }
}
