//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState, endpoints,
    logging::logging_middleware,
    transaction::{
        create_expense_endpoint, delete_expenses_endpoint, edit_expense_endpoint,
        get_dashboard_endpoint, get_report_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(
            endpoints::EXPENSES,
            post(create_expense_endpoint).delete(delete_expenses_endpoint),
        )
        .route(endpoints::EXPENSE, put(edit_expense_endpoint))
        .route(endpoints::REPORT, get(get_report_endpoint))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found" })),
    )
        .into_response()
}
