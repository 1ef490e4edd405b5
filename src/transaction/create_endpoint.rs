use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use time::{Date, Time};

use crate::{
    Error,
    app_state::LedgerState,
    transaction::core::{
        Amount, Transaction, TransactionKind, create_transaction, hour_minute,
    },
};

/// The JSON body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseForm {
    /// The owner of the new transaction.
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
    /// The time of day as `HH:MM`.
    #[serde(default, with = "hour_minute::option")]
    pub time: Option<Time>,
}

/// A route handler for creating a new transaction, responds with the created
/// transaction and its display ID.
pub async fn create_expense_endpoint(
    State(state): State<LedgerState>,
    payload: Result<Json<CreateExpenseForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let Json(form) = payload.map_err(|rejection| Error::InvalidArgument(rejection.body_text()))?;

    let builder = Transaction::build(form.amount, form.kind, &form.category, form.date)
        .description(form.description)
        .occurred_at(form.time);
    let owner = form.email;

    let transaction = state
        .run(move |connection| create_transaction(&owner, builder, connection))
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
