//! The filtered listing of an owner's transactions along with its totals.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::LedgerState,
    transaction::{
        core::Transaction,
        filter::{FilterQuery, FilterSpec},
        query::{ListOrder, list_filtered},
        summary::{Summary, period_label},
    },
};

/// The query string shared by the dashboard and the CSV report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    /// The owner whose transactions are listed.
    pub email: Option<String>,
    /// Either "id" (the default) or "date".
    pub order: Option<String>,
    /// Which transactions to include.
    #[serde(flatten)]
    pub filter: FilterQuery,
}

/// A filtered listing resolved against the ledger.
#[derive(Debug)]
pub(crate) struct Listing {
    pub owner: String,
    pub filter: FilterSpec,
    pub transactions: Vec<Transaction>,
}

/// Parse `query` and fetch the matching transactions.
///
/// The query is validated before the database is touched.
pub(crate) async fn load_listing(
    state: &LedgerState,
    query: ListingQuery,
) -> Result<Listing, Error> {
    let owner = query.email.unwrap_or_default();
    let order = parse_order(query.order.as_deref())?;
    let filter = FilterSpec::try_from(query.filter)?;
    let today = state.today()?;

    let transactions = {
        let owner = owner.clone();
        state
            .run(move |connection| list_filtered(&owner, &filter, order, today, connection))
            .await?
    };

    Ok(Listing {
        owner,
        filter,
        transactions,
    })
}

fn parse_order(order: Option<&str>) -> Result<ListOrder, Error> {
    match order.map(str::trim) {
        None | Some("") | Some("id") => Ok(ListOrder::DisplayId),
        Some("date") => Ok(ListOrder::Chronological),
        Some(other) => Err(Error::InvalidArgument(format!(
            "Unknown order '{other}', expected 'id' or 'date'"
        ))),
    }
}

/// The response body of the dashboard endpoint.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    owner: String,
    period: String,
    expenses: Vec<Transaction>,
    #[serde(flatten)]
    summary: Summary,
}

/// A route handler for the dashboard: the transactions selected by the
/// filter in the query string plus their income, expense and balance totals.
pub async fn get_dashboard_endpoint(
    State(state): State<LedgerState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Dashboard>, Error> {
    let listing = load_listing(&state, query).await?;
    let summary = Summary::from_transactions(&listing.transactions)?;

    Ok(Json(Dashboard {
        period: period_label(&listing.filter),
        summary,
        owner: listing.owner,
        expenses: listing.transactions,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use time::{OffsetDateTime, macros::date};

    use crate::{
        endpoints,
        transaction::{
            Transaction, TransactionKind, create_transaction,
            test_utils::{amount, get_test_server, get_test_state},
        },
    };

    fn seed(state: &crate::AppState) {
        let connection = state.db_connection.lock().unwrap();
        let today = OffsetDateTime::now_utc().date();
        for (value, kind, category, date) in [
            ("1000", TransactionKind::Income, "Salary", date!(2024 - 03 - 01)),
            ("12.50", TransactionKind::Expense, "Food", date!(2024 - 03 - 02)),
            ("40", TransactionKind::Expense, "Fuel", date!(2024 - 04 - 01)),
            ("5", TransactionKind::Expense, "Coffee", today),
        ] {
            create_transaction(
                "u1@example.com",
                Transaction::build(amount(value), kind, category, date),
                &connection,
            )
            .unwrap();
        }
        create_transaction(
            "u2@example.com",
            Transaction::build(
                amount("99"),
                TransactionKind::Expense,
                "Other",
                date!(2024 - 03 - 05),
            ),
            &connection,
        )
        .unwrap();
    }

    fn display_ids(body: &Value) -> Vec<i64> {
        body["expenses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|expense| expense["display_id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lists_month_with_totals() {
        let state = get_test_state();
        seed(&state);
        let server = get_test_server(state);

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .add_query_param("filter_type", "month")
            .add_query_param("start_date", "2024-03")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["owner"], json!("u1@example.com"));
        assert_eq!(body["period"], json!("Month: 2024-03"));
        assert_eq!(display_ids(&body), vec![1, 2]);
        assert_eq!(body["total_income"], json!("1000.00"));
        assert_eq!(body["total_expense"], json!("12.50"));
        assert_eq!(body["balance"], json!("987.50"));
    }

    #[tokio::test]
    async fn defaults_to_all_transactions() {
        let state = get_test_state();
        seed(&state);
        let server = get_test_server(state);

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["period"], json!("All time"));
        assert_eq!(display_ids(&body), vec![1, 2, 3, 4]);
        assert_eq!(body["balance"], json!("942.50"));
    }

    #[tokio::test]
    async fn resolves_relative_filters_against_today() {
        let state = get_test_state();
        seed(&state);
        let server = get_test_server(state);

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .add_query_param("filter_type", "lastDays")
            .add_query_param("days", "7")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(display_ids(&body), vec![4]);
        assert_eq!(body["period"], json!("Last 7 days"));
    }

    #[tokio::test]
    async fn rejects_unknown_filter_type() {
        let server = get_test_server(get_test_state());

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .add_query_param("filter_type", "fortnight")
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_reversed_date_range() {
        let server = get_test_server(get_test_state());

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .add_query_param("filter_type", "dateRange")
            .add_query_param("start_date", "2024-03-10")
            .add_query_param("end_date", "2024-03-01")
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_missing_email() {
        let server = get_test_server(get_test_state());

        server
            .get(endpoints::DASHBOARD)
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn orders_by_date_on_request() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            for date in [date!(2024 - 05 - 01), date!(2024 - 01 - 01)] {
                create_transaction(
                    "u1@example.com",
                    Transaction::build(amount("1"), TransactionKind::Expense, "Misc", date),
                    &connection,
                )
                .unwrap();
            }
        }
        let server = get_test_server(state);

        let response = server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .add_query_param("order", "date")
            .await;

        response.assert_status_ok();
        assert_eq!(display_ids(&response.json()), vec![2, 1]);
    }

    #[tokio::test]
    async fn overflowing_totals_are_rejected() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            for _ in 0..2 {
                create_transaction(
                    "u1@example.com",
                    Transaction::build(
                        amount("79228162514264337593543950335"),
                        TransactionKind::Income,
                        "Windfall",
                        date!(2024 - 03 - 01),
                    ),
                    &connection,
                )
                .unwrap();
            }
        }
        let server = get_test_server(state);

        server
            .get(endpoints::DASHBOARD)
            .add_query_param("email", "u1@example.com")
            .await
            .assert_status_bad_request();
    }
}
