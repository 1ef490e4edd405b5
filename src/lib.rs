//! Expense Ledger is a web service for tracking personal income and expenses.
//!
//! This library provides a JSON REST API over a SQLite ledger. Each owner's
//! transactions carry a dense, user-facing display ID (`1..=N`) that is kept
//! gap-free across deletions.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod routing;
mod timezone;
mod transaction;

pub use app_state::{AppState, DEFAULT_DB_TIMEOUT, LedgerState};
pub use database_id::{DatabaseId, DisplayId};
pub use db::{initialize as initialize_db, with_transaction};
pub use endpoints::format_endpoint;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::{get_local_offset, today_in};
pub use transaction::{
    Amount, DeletedCount, FilterQuery, FilterSpec, ListOrder, Predicate, Summary, Transaction,
    TransactionBuilder, TransactionKind, TransactionUpdate, compile_filter, count_transactions,
    create_transaction, delete_and_renumber, get_transaction, list_filtered, next_display_id,
    period_label, update_transaction,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not install the Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The caller supplied a malformed argument, e.g. a date range whose start
    /// is after its end, a negative day count or an empty set of IDs to delete.
    ///
    /// These errors are never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested resource was not found.
    ///
    /// For deletions this means none of the requested display IDs matched a
    /// transaction of the owner, and nothing was changed.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// SQLite reported that the database was busy or locked by another
    /// writer.
    ///
    /// Ledger operations retry on this error a bounded number of times before
    /// reporting [Error::Unavailable].
    #[error("the ledger was modified concurrently")]
    Conflict,

    /// The database could not be reached, or kept conflicting after retrying.
    ///
    /// Clients may retry since ledger operations are all-or-nothing.
    #[error("the ledger is unavailable: {0}")]
    Unavailable(String),

    /// A ledger operation did not finish before its deadline.
    ///
    /// The underlying SQLite transaction still runs to completion or is
    /// rolled back.
    #[error("the ledger operation timed out")]
    Timeout,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A CSV report could not be written.
    #[error("could not write the CSV report: {0}")]
    CsvError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if matches!(
                    sql_error.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Error::Conflict
            }
            rusqlite::Error::SqliteFailure(sql_error, ref description)
                if sql_error.code == rusqlite::ErrorCode::CannotOpen =>
            {
                Error::Unavailable(
                    description
                        .clone()
                        .unwrap_or_else(|| "could not open the database".to_owned()),
                )
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::InvalidArgument(reason) => (StatusCode::BAD_REQUEST, reason),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "No matching expenses found".to_owned(),
            ),
            Error::Conflict => (
                StatusCode::CONFLICT,
                "The ledger was modified by another request, try again".to_owned(),
            ),
            Error::Unavailable(_) | Error::Timeout | Error::DatabaseLockError => {
                tracing::error!("The ledger could not serve the request: {}", self);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The ledger is temporarily unavailable, try again later".to_owned(),
                )
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details"
                        .to_owned(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
