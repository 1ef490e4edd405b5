//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/expenses/{display_id}', use [format_endpoint].

/// The route for the filtered listing of an owner's transactions with totals.
pub const DASHBOARD: &str = "/api/dashboard";
/// The route to create transactions and to delete a batch of them.
pub const EXPENSES: &str = "/api/expenses";
/// The route to update a single transaction by its display ID.
pub const EXPENSE: &str = "/api/expenses/{display_id}";
/// The route to download a filtered listing as CSV.
pub const REPORT: &str = "/api/report.csv";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// Assumes `endpoint_path` contains exactly one parameter of the form `{name}`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => format!(
            "{}{id}{}",
            &endpoint_path[..start],
            &endpoint_path[end + 1..]
        ),
        _ => endpoint_path.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{EXPENSE, EXPENSES, format_endpoint};

    #[test]
    fn replaces_parameter() {
        assert_eq!(format_endpoint(EXPENSE, 42), "/api/expenses/42");
    }

    #[test]
    fn leaves_paths_without_parameters() {
        assert_eq!(format_endpoint(EXPENSES, 42), EXPENSES);
    }
}
