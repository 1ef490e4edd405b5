use std::str::FromStr;

use axum_test::TestServer;
use rusqlite::Connection;

use crate::{AppState, app_state::DEFAULT_DB_TIMEOUT, build_router};

use super::Amount;

/// Parse `value` as an [Amount], panicking on invalid input.
#[track_caller]
pub(crate) fn amount(value: &str) -> Amount {
    Amount::from_str(value).expect("invalid test amount")
}

/// An [AppState] backed by an initialized in-memory database.
pub(crate) fn get_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "Etc/UTC", DEFAULT_DB_TIMEOUT).expect("Could not create app state")
}

/// A test server with every route of the app.
pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}
