//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
///
/// This is the physical row identity of a transaction and is never shown to
/// the user.
pub type DatabaseId = i64;

/// The user-facing sequence number of a transaction within one owner's ledger.
///
/// For every owner the display IDs of their transactions always form the
/// contiguous sequence `1..=N`.
pub type DisplayId = i64;
