use axum::{
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    app_state::LedgerState,
    transaction::{
        dashboard_endpoint::{ListingQuery, load_listing},
        report::{report_file_name, write_report},
    },
};

/// A route handler for downloading the filtered listing as a CSV attachment.
pub async fn get_report_endpoint(
    State(state): State<LedgerState>,
    Query(query): Query<ListingQuery>,
) -> Result<Response, Error> {
    let listing = load_listing(&state, query).await?;
    let report = write_report(&listing.transactions)?;
    let file_name = report_file_name(&listing.owner, state.today()?);

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        report,
    )
        .into_response())
}
