//! Totals and period labels shown alongside a filtered listing.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    transaction::{
        core::{Amount, Transaction, TransactionKind, format_two_digits},
        filter::FilterSpec,
    },
};

/// Income and expense totals over a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The sum of all income.
    pub total_income: Amount,
    /// The sum of all expenses.
    pub total_expense: Amount,
    /// Income minus expenses, negative when more was spent than earned.
    #[serde(serialize_with = "serialize_two_digits")]
    pub balance: Decimal,
}

impl Summary {
    /// Sum `transactions` by kind using exact decimal arithmetic.
    ///
    /// # Errors
    /// Returns [Error::InvalidArgument] if a total is too large to represent.
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self, Error> {
        let total = |kind: TransactionKind| -> Result<Decimal, Error> {
            transactions
                .iter()
                .filter(|transaction| transaction.kind == kind)
                .try_fold(Decimal::ZERO, |sum, transaction| {
                    sum.checked_add(transaction.amount.value())
                })
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("the total {kind} is too large to compute"))
                })
        };

        let income = total(TransactionKind::Income)?;
        let expense = total(TransactionKind::Expense)?;

        Ok(Self {
            total_income: Amount::new(income)?,
            total_expense: Amount::new(expense)?,
            // Both totals are non-negative so the difference cannot overflow.
            balance: income - expense,
        })
    }
}

fn serialize_two_digits<S: serde::Serializer>(
    value: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_two_digits(*value))
}

/// A human readable description of the period `filter` selects.
pub fn period_label(filter: &FilterSpec) -> String {
    match filter {
        FilterSpec::All => "All time".to_owned(),
        FilterSpec::ExactDate(date) => format!("Date: {date}"),
        FilterSpec::Month { year, month } => format!("Month: {year}-{:02}", u8::from(*month)),
        FilterSpec::Year(year) => format!("Year: {year}"),
        FilterSpec::LastDays(days) => format!("Last {days} days"),
        FilterSpec::LastMonths(months) => format!("Last {months} months"),
        FilterSpec::DateRange { start, end } => format!("From {start} to {end}"),
    }
}
