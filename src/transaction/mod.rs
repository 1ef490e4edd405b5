//! Transaction management for the expense ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - The filter compiler that turns date filters into SQL predicates
//! - Batch deletion that keeps each owner's display IDs dense
//! - Route handlers for the JSON API and CSV report

mod core;
mod create_endpoint;
mod dashboard_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod filter;
mod query;
mod renumber;
mod report;
mod report_endpoint;
mod summary;

#[cfg(test)]
pub(crate) mod test_utils;

pub use self::core::{
    Amount, Transaction, TransactionBuilder, TransactionKind, TransactionUpdate,
    count_transactions, create_transaction, create_transaction_table, get_transaction,
    map_transaction_row, next_display_id, update_transaction,
};
pub use create_endpoint::{CreateExpenseForm, create_expense_endpoint};
pub use dashboard_endpoint::{Dashboard, ListingQuery, get_dashboard_endpoint};
pub use delete_endpoint::{DeleteExpensesForm, DeleteExpensesResponse, delete_expenses_endpoint};
pub use edit_endpoint::{EditExpenseForm, edit_expense_endpoint};
pub use filter::{FilterQuery, FilterSpec, Predicate, compile_filter};
pub use query::{ListOrder, list_filtered};
pub use renumber::{DeletedCount, delete_and_renumber};
pub use report::{report_file_name, write_report};
pub use report_endpoint::get_report_endpoint;
pub use summary::{Summary, period_label};
