//! Batch deletion that keeps each owner's display IDs dense.
//!
//! After rows are removed, every surviving transaction of the owner is given a
//! new display ID so that the owner's IDs are exactly `1..=N` again, ordered by
//! date with ties broken by row ID. Deleting and renumbering happen in one
//! SQLite transaction: other connections either see the ledger before the
//! deletion or after the renumbering, never in between.
//!
//! Display IDs are unique per owner, so assigning the final values directly
//! could collide with IDs that have not been moved yet. Surviving IDs are
//! therefore first negated into a range no live ID can occupy, and the final
//! values are assigned from there in a single statement.

use std::{collections::BTreeSet, fmt, thread, time::Duration};

use rusqlite::Connection;

use crate::{
    Error,
    database_id::DisplayId,
    db::with_transaction,
    transaction::core::validate_owner,
};

/// The number of transactions removed by [delete_and_renumber].
pub type DeletedCount = usize;

/// How many times a conflicting delete is attempted before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// The pause before the first retry, increased linearly on each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// The phases a delete-and-renumber call moves through.
///
/// `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Validating,
    Deleting,
    Renumbering,
    Committed,
    RolledBack,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validating => "validating",
            Phase::Deleting => "deleting",
            Phase::Renumbering => "renumbering",
            Phase::Committed => "committed",
            Phase::RolledBack => "rolled back",
        };

        f.write_str(name)
    }
}

/// Delete the transactions of `owner` with the given display IDs, then
/// renumber the owner's remaining transactions to `1..=N`.
///
/// The new IDs follow ascending date, with ties broken by ascending row ID.
/// Every surviving transaction may receive a new ID, not only those after a
/// deleted one.
///
/// If SQLite reports the database as busy or locked the whole operation is
/// retried, up to a small fixed number of attempts.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidArgument] if `owner` is blank, `ids` is empty or contains
///   a non-positive ID,
/// - [Error::NotFound] if none of `ids` belong to a transaction of `owner`,
/// - [Error::Unavailable] if the database stayed busy after retrying,
/// - or [Error::SqlError] if there is some other SQL error.
///
/// On any error the ledger is left exactly as it was.
pub fn delete_and_renumber(
    owner: &str,
    ids: &BTreeSet<DisplayId>,
    connection: &Connection,
) -> Result<DeletedCount, Error> {
    log_phase(owner, Phase::Validating);
    if let Err(error) = validate(owner, ids) {
        log_phase(owner, Phase::RolledBack);
        return Err(error);
    }

    retry_on_conflict(owner, || {
        match with_transaction(connection, |connection| {
            delete_then_renumber(owner, ids, connection)
        }) {
            Ok(deleted_count) => {
                log_phase(owner, Phase::Committed);
                Ok(deleted_count)
            }
            Err(error) => {
                log_phase(owner, Phase::RolledBack);
                Err(error)
            }
        }
    })
}

fn validate(owner: &str, ids: &BTreeSet<DisplayId>) -> Result<(), Error> {
    validate_owner(owner)?;

    if ids.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one ID must be given to delete".to_owned(),
        ));
    }

    if let Some(id) = ids.iter().find(|&&id| id < 1) {
        return Err(Error::InvalidArgument(format!(
            "display IDs are positive, got {id}"
        )));
    }

    Ok(())
}

fn delete_then_renumber(
    owner: &str,
    ids: &BTreeSet<DisplayId>,
    connection: &Connection,
) -> Result<DeletedCount, Error> {
    log_phase(owner, Phase::Deleting);
    let deleted_count = delete_by_display_ids(owner, ids, connection)?;

    if deleted_count == 0 {
        return Err(Error::NotFound);
    }

    log_phase(owner, Phase::Renumbering);
    renumber(owner, connection)?;

    tracing::info!(owner, deleted_count, "Deleted and renumbered transactions");

    Ok(deleted_count)
}

fn delete_by_display_ids(
    owner: &str,
    ids: &BTreeSet<DisplayId>,
    connection: &Connection,
) -> Result<DeletedCount, Error> {
    // The IDs are bound as one JSON array so the set size is not limited by
    // SQLite's maximum number of host parameters.
    let id_array = format!(
        "[{}]",
        ids.iter()
            .map(DisplayId::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    connection
        .execute(
            "DELETE FROM \"transaction\" \
             WHERE owner = ?1 AND display_id IN (SELECT value FROM json_each(?2))",
            (owner, id_array),
        )
        .map_err(|error| error.into())
}

fn renumber(owner: &str, connection: &Connection) -> Result<(), Error> {
    // Stage: live IDs are positive, so negated IDs cannot collide with them.
    connection.execute(
        "UPDATE \"transaction\" SET display_id = -display_id WHERE owner = ?1",
        [owner],
    )?;

    connection.execute(
        "UPDATE \"transaction\" SET display_id = ordered.new_display_id \
         FROM ( \
             SELECT id, ROW_NUMBER() OVER (ORDER BY date ASC, id ASC) AS new_display_id \
             FROM \"transaction\" WHERE owner = ?1 \
         ) AS ordered \
         WHERE \"transaction\".id = ordered.id",
        [owner],
    )?;

    Ok(())
}

/// Run `operation`, retrying it while it fails with [Error::Conflict].
///
/// After [MAX_ATTEMPTS] conflicting attempts [Error::Unavailable] is returned.
fn retry_on_conflict<T>(
    owner: &str,
    mut operation: impl FnMut() -> Result<T, Error>,
) -> Result<T, Error> {
    for attempt in 1..=MAX_ATTEMPTS {
        match operation() {
            Err(Error::Conflict) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(owner, attempt, "Ledger was busy, retrying");
                thread::sleep(RETRY_BACKOFF * attempt);
            }
            Err(Error::Conflict) => {
                return Err(Error::Unavailable(format!(
                    "the ledger stayed busy after {MAX_ATTEMPTS} attempts"
                )));
            }
            result => return result,
        }
    }

    Err(Error::Unavailable(format!(
        "the ledger stayed busy after {MAX_ATTEMPTS} attempts"
    )))
}

fn log_phase(owner: &str, phase: Phase) {
    tracing::debug!(owner, %phase, "delete and renumber");
}
