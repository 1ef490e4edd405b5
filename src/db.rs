//! Database initialisation and the transactional unit-of-work primitive.

use std::time::Duration;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, transaction::create_transaction_table};

/// How long SQLite waits on a lock held by another connection before
/// reporting `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Create the application's tables in the database if they do not exist.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.busy_timeout(BUSY_TIMEOUT)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Run `operation` as a single atomic unit of work.
///
/// An IMMEDIATE SQLite transaction is opened so the write lock is taken up
/// front. The transaction is committed if `operation` returns `Ok`, otherwise
/// it is rolled back and the error from `operation` is returned unchanged.
///
/// Calls must not be nested on the same connection.
///
/// # Errors
/// Returns the error produced by `operation`, or an [Error] if the
/// transaction could not be started or committed.
pub fn with_transaction<T, F>(connection: &Connection, operation: F) -> Result<T, Error>
where
    F: FnOnce(&Connection) -> Result<T, Error>,
{
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    match operation(&transaction) {
        Ok(value) => {
            transaction.commit()?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = transaction.rollback() {
                tracing::error!("Could not roll back transaction after {error}: {rollback_error}");
            }

            Err(error)
        }
    }
}
