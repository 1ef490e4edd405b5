//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::extract::FromRef;
use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    db::initialize,
    timezone::{get_local_offset, today_in},
};

/// The default deadline for a single ledger operation.
pub const DEFAULT_DB_TIMEOUT: Duration = Duration::from_secs(5);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// How long a request waits for a ledger operation before giving up.
    pub db_timeout: Duration,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the timezone is not known.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        db_timeout: Duration,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            db_timeout,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

/// The state needed by the ledger endpoints.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How long a request waits for a ledger operation before giving up.
    pub db_timeout: Duration,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            db_timeout: state.db_timeout,
        }
    }
}

impl LedgerState {
    /// The current date in the server's timezone.
    pub fn today(&self) -> Result<Date, Error> {
        today_in(&self.local_timezone)
    }

    /// Run `operation` against the database on the blocking thread pool.
    ///
    /// If the deadline passes, the caller gets [Error::Timeout] while the
    /// operation keeps running in the background, so a SQLite transaction it
    /// started is still committed or rolled back.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::DatabaseLockError] if the connection mutex is poisoned,
    /// - [Error::Timeout] if the deadline passed,
    /// - [Error::Unavailable] if the blocking task panicked,
    /// - or whatever error `operation` returned.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
    {
        let db_connection = self.db_connection.clone();

        let task = tokio::task::spawn_blocking(move || {
            let connection = db_connection.lock().map_err(|error| {
                tracing::error!("Could not acquire database lock: {error}");
                Error::DatabaseLockError
            })?;

            operation(&connection)
        });

        match tokio::time::timeout(self.db_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::error!("Ledger task failed: {error}");
                Err(Error::Unavailable(error.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    "Ledger operation exceeded its deadline of {:?}",
                    self.db_timeout
                );
                Err(Error::Timeout)
            }
        }
    }
}
