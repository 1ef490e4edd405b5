//! Database query helpers for the dashboard and report listings.

use rusqlite::{Connection, params_from_iter};
use time::Date;

use crate::{
    Error,
    transaction::{
        core::{SELECT_COLUMNS, Transaction, map_transaction_row},
        filter::{FilterSpec, compile_filter},
    },
};

/// The order to return transactions in from [list_filtered].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Ascending display ID, which matches the owner's dense sequence.
    #[default]
    DisplayId,
    /// Ascending date, ties broken by the order the rows were created in.
    Chronological,
}

impl ListOrder {
    fn order_clause(self) -> &'static str {
        match self {
            Self::DisplayId => "ORDER BY display_id ASC",
            Self::Chronological => "ORDER BY date ASC, id ASC",
        }
    }
}

/// Get the transactions of `owner` selected by `filter`.
///
/// Relative filters such as [FilterSpec::LastDays] are resolved against
/// `today`. The same filter against an unchanged ledger always returns the
/// same transactions in the same order.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidArgument] if the filter cannot be compiled, in which case
///   no query is run,
/// - or [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn list_filtered(
    owner: &str,
    filter: &FilterSpec,
    order: ListOrder,
    today: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let predicate = compile_filter(owner, filter, today)?;

    let query = format!(
        "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE {} {}",
        predicate.clause,
        order.order_clause()
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(predicate.params.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}
