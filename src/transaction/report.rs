//! CSV export of a filtered listing.

use time::Date;

use crate::{Error, transaction::core::Transaction};

const HEADER: [&str; 7] = [
    "ID",
    "Category",
    "Type",
    "Amount",
    "Date",
    "Time",
    "Description",
];

/// Write `transactions` as CSV, one row per transaction, in the given order.
///
/// Amounts are written with two fraction digits and times as `HH:MM`.
///
/// # Errors
/// Returns [Error::CsvError] if a row could not be written.
pub fn write_report(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_error)?;

    for transaction in transactions {
        let time = transaction
            .occurred_at
            .map(|time| format!("{:02}:{:02}", time.hour(), time.minute()))
            .unwrap_or_default();

        writer
            .write_record([
                transaction.display_id.to_string(),
                transaction.category.clone(),
                transaction.kind.to_string(),
                transaction.amount.to_string(),
                transaction.occurred_on.to_string(),
                time,
                transaction.description.clone().unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// The download file name for a report of `owner` generated on `today`.
///
/// `@` and `.` are replaced so the owner's email is safe to use in a file name.
pub fn report_file_name(owner: &str, today: Date) -> String {
    let owner: String = owner
        .chars()
        .map(|c| match c {
            '@' | '.' => '_',
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect();

    format!("expenses_{owner}_{today}.csv")
}

fn csv_error(error: csv::Error) -> Error {
    Error::CsvError(error.to_string())
}
