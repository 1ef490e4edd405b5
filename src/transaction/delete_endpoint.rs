use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::LedgerState,
    database_id::DisplayId,
    transaction::renumber::{DeletedCount, delete_and_renumber},
};

/// The JSON body for deleting a batch of transactions.
#[derive(Debug, Deserialize)]
pub struct DeleteExpensesForm {
    /// The owner of the transactions.
    pub email: String,
    /// The display IDs to delete. Duplicates are ignored.
    pub ids: BTreeSet<DisplayId>,
}

/// The response body of a successful batch delete.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteExpensesResponse {
    /// How many transactions were removed.
    pub deleted_count: DeletedCount,
}

/// A route handler for deleting a batch of transactions.
///
/// The owner's remaining transactions are renumbered in the same database
/// transaction, so a client that refetches after a success sees display IDs
/// `1..=N` again. If the request is abandoned the delete still finishes or
/// rolls back as a whole.
pub async fn delete_expenses_endpoint(
    State(state): State<LedgerState>,
    payload: Result<Json<DeleteExpensesForm>, JsonRejection>,
) -> Result<Json<DeleteExpensesResponse>, Error> {
    let Json(form) = payload.map_err(|rejection| Error::InvalidArgument(rejection.body_text()))?;

    let DeleteExpensesForm { email, ids } = form;

    let deleted_count = state
        .run(move |connection| delete_and_renumber(&email, &ids, connection))
        .await?;

    Ok(Json(DeleteExpensesResponse { deleted_count }))
}
