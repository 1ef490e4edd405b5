use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime, Time};

use expense_ledger::{Amount, Transaction, TransactionKind, create_transaction, initialize_db};

/// A utility for creating a test database for the REST API server of expense_ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The owner the demo transactions belong to.
    #[arg(long, default_value = "test@example.com")]
    email: String,
}

/// Amounts are in cents.
const DEMO_TRANSACTIONS: [(i64, TransactionKind, &str, &str); 8] = [
    (450_000, TransactionKind::Income, "Salary", "Monthly pay"),
    (12_550, TransactionKind::Expense, "Groceries", "Weekly shop"),
    (4_599, TransactionKind::Expense, "Transport", "Fuel"),
    (1_850, TransactionKind::Expense, "Food", "Lunch with friends"),
    (150_000, TransactionKind::Expense, "Rent", "Fortnightly rent"),
    (2_000, TransactionKind::Income, "Gifts", "Birthday"),
    (899, TransactionKind::Expense, "Subscriptions", "Music streaming"),
    (6_720, TransactionKind::Expense, "Utilities", "Power bill"),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo transactions for {}...", args.email);

    let today = OffsetDateTime::now_utc().date();

    // Roughly three months of history, oldest first.
    for week in 0..12_i64 {
        for (index, (cents, kind, category, description)) in DEMO_TRANSACTIONS.iter().enumerate() {
            if index as i64 % 4 != week % 4 && *kind == TransactionKind::Expense {
                continue;
            }
            if *kind == TransactionKind::Income && week % 4 != 0 {
                continue;
            }

            let days_ago = (11 - week) * 7 + index as i64;
            let occurred_at = Time::from_hms(8 + index as u8, 15, 0)?;

            create_transaction(
                &args.email,
                Transaction::build(
                    Amount::new(Decimal::new(*cents, 2))?,
                    *kind,
                    category,
                    today - Duration::days(days_ago),
                )
                .description(Some((*description).to_owned()))
                .occurred_at(Some(occurred_at)),
                &conn,
            )?;
        }
    }

    println!("Success!");

    Ok(())
}
