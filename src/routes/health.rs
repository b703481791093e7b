use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::models::domain::Domain;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "domains": Domain::ALL,
    });
    (StatusCode::OK, Json(body))
}
