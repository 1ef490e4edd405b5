use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    app_state::LedgerState,
    database_id::DisplayId,
    transaction::core::{
        Amount, Transaction, TransactionKind, TransactionUpdate, update_transaction,
    },
};

/// The JSON body for editing a transaction.
#[derive(Debug, Deserialize)]
pub struct EditExpenseForm {
    /// The owner of the transaction.
    pub email: String,
    /// A non-negative amount, as a JSON number or decimal string.
    pub amount: Amount,
    /// "Income" or "Expense".
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// A free-text label.
    pub category: String,
    /// An optional note.
    #[serde(default)]
    pub description: Option<String>,
    /// The date as `YYYY-MM-DD`.
    pub date: Date,
}

/// A route handler for updating a transaction in place, responds with the
/// updated transaction.
///
/// The display ID does not change, even when the date does.
pub async fn edit_expense_endpoint(
    State(state): State<LedgerState>,
    Path(display_id): Path<DisplayId>,
    payload: Result<Json<EditExpenseForm>, JsonRejection>,
) -> Result<Json<Transaction>, Error> {
    let Json(form) = payload.map_err(|rejection| Error::InvalidArgument(rejection.body_text()))?;

    let owner = form.email;
    let update = TransactionUpdate {
        amount: form.amount,
        kind: form.kind,
        category: form.category,
        description: form.description,
        occurred_on: form.date,
    };

    let transaction = state
        .run(move |connection| update_transaction(&owner, display_id, update, connection))
        .await
        .inspect_err(|error| {
            tracing::debug!("Could not update transaction {display_id}: {error}")
        })?;

    Ok(Json(transaction))
}
