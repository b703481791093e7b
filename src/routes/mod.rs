pub mod health;
pub mod questions;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        questions::list_domains,
        questions::random_question,
        questions::grade_question,
        questions::generate_responses,
        questions::average_response_time,
        questions::accuracy_summary,
    ),
    components(schemas(
        crate::models::domain::Domain,
        crate::models::question::AnswerLetter,
        crate::models::question::Accuracy,
        crate::models::question::AnswerOptions,
        crate::models::question::QuestionRecord,
        crate::services::grading_service::GradingStatus,
        crate::services::batch_service::BatchSummary,
        crate::dto::question_dto::GradeQuestionRequest,
        crate::dto::question_dto::GradeQuestionResponse,
        crate::dto::question_dto::BatchResponse,
        crate::dto::question_dto::AverageResponseTimeResponse,
        crate::dto::question_dto::AccuracySummaryResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Every endpoint of the service. The question API sits behind the
/// requests-per-second limiter; health and docs do not.
pub fn router(state: AppState, rps: u32) -> Router {
    let question_api = Router::new()
        .route("/domains", get(questions::list_domains))
        .route("/random-question", get(questions::random_question))
        .route("/chatgpt-response", post(questions::grade_question))
        .route(
            "/generate-chatgpt-responses",
            get(questions::generate_responses),
        )
        .route(
            "/average-response-time",
            get(questions::average_response_time),
        )
        .route("/accuracy-summary", get(questions::accuracy_summary))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(question_api)
        .with_state(state)
}
