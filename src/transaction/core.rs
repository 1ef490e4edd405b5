//! Defines the core data models and database queries for transactions.

use std::{fmt, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use time::{Date, OffsetDateTime, Time};

use crate::{
    Error,
    database_id::{DatabaseId, DisplayId},
    db::with_transaction,
};

time::serde::format_description!(pub(crate) hour_minute, Time, "[hour]:[minute]");

// ============================================================================
// MODELS
// ============================================================================

/// A non-negative amount of money with exact decimal semantics.
///
/// Amounts are stored as decimal text so no binary floating-point drift is
/// introduced, and are always rendered with two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new amount.
    ///
    /// # Errors
    /// Returns [Error::InvalidArgument] if `value` is negative.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::InvalidArgument(format!(
                "amount must not be negative, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// The exact decimal value of the amount.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|error| Error::InvalidArgument(format!("invalid amount \"{s}\": {error}")))?;

        Amount::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_two_digits(self.0))
    }
}

/// Render `value` rounded half away from zero to exactly two fraction digits.
pub(crate) fn format_two_digits(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    format!("{rounded:.2}")
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        let decimal =
            Decimal::from_str(text).map_err(|error| FromSqlError::Other(Box::new(error)))?;

        Ok(Amount(decimal))
    }
}

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money that was earned.
    Income,
    /// Money that was spent.
    Expense,
}

impl TransactionKind {
    /// The name stored in the database and shown in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "Income" => Ok(Self::Income),
            "Expense" => Ok(Self::Expense),
            other => Err(FromSqlError::Other(
                format!("invalid transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The physical row ID, used only to break ties when renumbering.
    #[serde(skip_serializing)]
    pub id: DatabaseId,
    /// The user that owns the transaction, e.g. an email address.
    pub owner: String,
    /// The owner's sequence number for this transaction.
    pub display_id: DisplayId,
    /// The amount of money spent or earned in this transaction.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// A free-text label, e.g. "Groceries".
    pub category: String,
    /// An optional note about what the transaction was for.
    pub description: Option<String>,
    /// When the transaction happened.
    pub occurred_on: Date,
    /// The time of day the transaction happened, if known.
    #[serde(with = "hour_minute::option")]
    pub occurred_at: Option<Time>,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: Amount,
        kind: TransactionKind,
        category: &str,
        occurred_on: Date,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            category: category.to_owned(),
            description: None,
            occurred_on,
            occurred_at: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The display ID, row ID and recording timestamp are assigned by
/// [create_transaction].
///
/// # Examples
///
/// ```ignore
/// use rust_decimal::Decimal;
/// use time::macros::{date, time};
///
/// let builder = Transaction::build(
///         Amount::new(Decimal::new(4599, 2)).unwrap(),
///         TransactionKind::Expense,
///         "Coffee",
///         date!(2025 - 01 - 15),
///     )
///     .description(Some("Flat white".to_owned()))
///     .occurred_at(Some(time!(08:30)));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// A free-text label for the transaction. Must not be blank.
    pub category: String,
    /// An optional note about what the transaction was for.
    pub description: Option<String>,
    /// The calendar date of the transaction, compared as a plain date.
    pub occurred_on: Date,
    /// The time of day the transaction happened, independent of the date.
    pub occurred_at: Option<Time>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the time of day for the transaction.
    pub fn occurred_at(mut self, occurred_at: Option<Time>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// The fields of a transaction that its owner may change after creation.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionUpdate {
    /// The new amount.
    pub amount: Amount,
    /// The new kind.
    pub kind: TransactionKind,
    /// The new category. Must not be blank.
    pub category: String,
    /// The new description.
    pub description: Option<String>,
    /// The new date.
    pub occurred_on: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns [map_transaction_row] expects, in order.
pub(crate) const SELECT_COLUMNS: &str =
    "id, owner, display_id, amount, kind, category, description, date, time, recorded_at";

/// Create a new transaction for `owner` from a builder.
///
/// The transaction is given the next unused display ID for `owner`. Reading
/// the next ID and inserting the row happen in one SQLite transaction so
/// concurrent inserts for the same owner cannot receive the same display ID.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidArgument] if `owner` or the category is blank,
/// - [Error::Conflict] if the database was locked by another writer,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    owner: &str,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_owner(owner)?;
    validate_category(&builder.category)?;

    with_transaction(connection, |connection| {
        let display_id = next_display_id(owner, connection)?;

        let transaction = connection
            .prepare(&format!(
                "INSERT INTO \"transaction\" \
                 (owner, display_id, amount, kind, category, description, date, time, recorded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 RETURNING {SELECT_COLUMNS}"
            ))?
            .query_row(
                rusqlite::params![
                    owner,
                    display_id,
                    builder.amount,
                    builder.kind,
                    builder.category.trim(),
                    builder.description,
                    builder.occurred_on,
                    builder.occurred_at,
                    OffsetDateTime::now_utc(),
                ],
                map_transaction_row,
            )?;

        tracing::debug!(
            owner,
            display_id,
            "Created transaction with row ID {}",
            transaction.id
        );

        Ok(transaction)
    })
}

/// Update the transaction identified by `(owner, display_id)` in place.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidArgument] if `owner` or the category is blank,
/// - [Error::NotFound] if `owner` has no transaction with `display_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    owner: &str,
    display_id: DisplayId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_owner(owner)?;
    validate_category(&update.category)?;

    connection
        .prepare(&format!(
            "UPDATE \"transaction\" \
             SET amount = ?1, kind = ?2, category = ?3, description = ?4, date = ?5 \
             WHERE owner = ?6 AND display_id = ?7 \
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                update.amount,
                update.kind,
                update.category.trim(),
                update.description,
                update.occurred_on,
                owner,
                display_id,
            ],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Retrieve the transaction identified by `(owner, display_id)`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `owner` has no transaction with `display_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    owner: &str,
    display_id: DisplayId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE owner = ?1 AND display_id = ?2"
        ))?
        .query_one((owner, display_id), map_transaction_row)?;

    Ok(transaction)
}

/// The display ID the next transaction created for `owner` will receive.
///
/// This is one more than the largest display ID of `owner`, or 1 if `owner`
/// has no transactions. Callers that insert with the returned value must do
/// so in the same SQLite transaction as this read.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn next_display_id(owner: &str, connection: &Connection) -> Result<DisplayId, Error> {
    connection
        .query_row(
            "SELECT COALESCE(MAX(display_id), 0) + 1 FROM \"transaction\" WHERE owner = ?1",
            [owner],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Get the number of transactions owned by `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(owner: &str, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE owner = ?1",
            [owner],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                display_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('Income', 'Expense')),
                category TEXT NOT NULL,
                description TEXT,
                date TEXT NOT NULL,
                time TEXT,
                recorded_at TEXT NOT NULL,
                UNIQUE(owner, display_id)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Used by the filtered listing and by renumbering.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_date ON \"transaction\"(owner, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// The row must contain the columns in the order of `SELECT_COLUMNS`.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        owner: row.get(1)?,
        display_id: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        category: row.get(5)?,
        description: row.get(6)?,
        occurred_on: row.get(7)?,
        occurred_at: row.get(8)?,
        recorded_at: row.get(9)?,
    })
}

pub(crate) fn validate_owner(owner: &str) -> Result<(), Error> {
    if owner.trim().is_empty() {
        return Err(Error::InvalidArgument("Email is required".to_owned()));
    }

    Ok(())
}

fn validate_category(category: &str) -> Result<(), Error> {
    if category.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "category must not be empty".to_owned(),
        ));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod amount_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::Error;

    use super::Amount;

    #[test]
    fn displays_two_fraction_digits() {
        assert_eq!(Amount::from_str("12").unwrap().to_string(), "12.00");
        assert_eq!(Amount::from_str("0.1").unwrap().to_string(), "0.10");
        assert_eq!(Amount::from_str("3.456").unwrap().to_string(), "3.46");
        assert_eq!(Amount::from_str("0.125").unwrap().to_string(), "0.13");
    }

    #[test]
    fn sums_without_drift() {
        let total: Decimal = ["0.1", "0.2"]
            .iter()
            .map(|amount| Amount::from_str(amount).unwrap().value())
            .sum();

        assert_eq!(total, Decimal::new(3, 1));
    }

    #[test]
    fn rejects_negative_amounts() {
        let result = Amount::new(Decimal::new(-1, 0));

        assert!(
            matches!(result, Err(Error::InvalidArgument(_))),
            "want InvalidArgument, got {result:?}"
        );
    }

    #[test]
    fn rejects_garbage() {
        let result = Amount::from_str("twelve");

        assert!(
            matches!(result, Err(Error::InvalidArgument(_))),
            "want InvalidArgument, got {result:?}"
        );
    }

    #[test]
    fn deserializes_from_json_number_and_string() {
        let from_number: Amount = serde_json::from_str("12.5").unwrap();
        let from_string: Amount = serde_json::from_str("\"12.5\"").unwrap();

        assert_eq!(from_number, Amount::new(Decimal::new(125, 1)).unwrap());
        assert_eq!(from_string, from_number);
        assert!(serde_json::from_str::<Amount>("-3").is_err());
    }
}
