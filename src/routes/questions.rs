use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
};
use validator::Validate;

use crate::{
    dto::question_dto::{
        AccuracySummaryResponse, AverageResponseTimeResponse, BatchResponse, DomainQuery,
        GradeQuestionRequest, GradeQuestionResponse,
    },
    error::{Error, Result},
    models::{domain::Domain, question::QuestionRecord},
    AppState,
};

#[utoipa::path(
    get,
    path = "/domains",
    responses(
        (status = 200, description = "Known domains", body = [Domain])
    )
)]
#[axum::debug_handler]
pub async fn list_domains() -> Json<Vec<Domain>> {
    Json(Domain::ALL.to_vec())
}

#[utoipa::path(
    get,
    path = "/random-question",
    params(DomainQuery),
    responses(
        (status = 200, description = "A random question of the domain", body = QuestionRecord),
        (status = 400, description = "Invalid domain"),
        (status = 404, description = "Domain has no questions")
    )
)]
#[axum::debug_handler]
pub async fn random_question(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<QuestionRecord>> {
    let domain = query.parse()?;
    let record = state
        .store
        .sample_one(domain)
        .await?
        .ok_or(Error::NoQuestions(domain))?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/chatgpt-response",
    request_body = GradeQuestionRequest,
    responses(
        (status = 200, description = "Question graded", body = GradeQuestionResponse),
        (status = 400, description = "Invalid domain or incomplete body"),
        (status = 404, description = "Question not found"),
        (status = 500, description = "Storage failure")
    )
)]
#[axum::debug_handler]
pub async fn grade_question(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GradeQuestionRequest>, JsonRejection>,
) -> Result<Json<GradeQuestionResponse>> {
    let Json(req) = payload?;
    let (domain, id) = req.target()?;
    req.validate()?;

    tracing::info!(%domain, question_id = id, "grading single question");
    let outcome = state.grading_service.grade_by_id(domain, id).await?;
    Ok(Json(GradeQuestionResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/generate-chatgpt-responses",
    params(DomainQuery),
    responses(
        (status = 200, description = "Every question of the domain was processed", body = BatchResponse),
        (status = 400, description = "Invalid domain"),
        (status = 404, description = "Domain has no questions"),
        (status = 409, description = "A batch for this domain is already running")
    )
)]
#[axum::debug_handler]
pub async fn generate_responses(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<BatchResponse>> {
    let domain = query.parse()?;
    let summary = state.batch_service.run(domain).await?;
    Ok(Json(BatchResponse::from(summary)))
}

#[utoipa::path(
    get,
    path = "/average-response-time",
    params(DomainQuery),
    responses(
        (status = 200, description = "Mean latency of graded questions", body = AverageResponseTimeResponse),
        (status = 400, description = "Invalid domain"),
        (status = 404, description = "No timed responses yet")
    )
)]
#[axum::debug_handler]
pub async fn average_response_time(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<AverageResponseTimeResponse>> {
    let domain = query.parse()?;
    let average = state
        .store
        .average_response_time(domain)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No timed responses for domain {}", domain)))?;
    Ok(Json(AverageResponseTimeResponse {
        domain,
        average_response_time_ms: average,
    }))
}

#[utoipa::path(
    get,
    path = "/accuracy-summary",
    params(DomainQuery),
    responses(
        (status = 200, description = "Grading tallies for the domain", body = AccuracySummaryResponse),
        (status = 400, description = "Invalid domain")
    )
)]
#[axum::debug_handler]
pub async fn accuracy_summary(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<AccuracySummaryResponse>> {
    let domain = query.parse()?;
    let counts = state.store.accuracy_counts(domain).await?;
    Ok(Json(AccuracySummaryResponse::new(domain, counts)))
}
