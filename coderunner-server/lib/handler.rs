//! Request handlers for the coderunner server.
//!
//! This module implements:
//! - Health and capability endpoints
//! - Full evaluation and quick execution
//! - The fallback for unknown routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use coderunner_core::{
    evaluation::{EvaluationRequest, DEFAULT_TASK_MARKS},
    execution::ExecutionRequest,
    registry::Language,
};
use coderunner_utils::SERVICE_NAME;

use crate::{
    error::{ServerError, ValidationError},
    payload::{
        ExecuteRequest, HealthResponse, LanguagesResponse, QuickExecuteRequest,
        QuickExecuteResponse,
    },
    state::AppState,
    ServerResult,
};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for health check
pub async fn health() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    ))
}

/// Handler for full evaluation: structural analysis, test cases and scoring
pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let (code, language) = required_fields(payload.code, payload.language.as_deref())?;

    tracing::info!(
        "executing {} code ({} test cases, {} structural constraints)",
        language,
        payload.test_cases.len(),
        payload.structural_constraints.len()
    );

    let task_marks = payload
        .task_marks
        .filter(|marks| marks.is_finite() && *marks > 0.0)
        .unwrap_or(DEFAULT_TASK_MARKS);

    let request = EvaluationRequest::builder()
        .language(language)
        .code(code)
        .test_cases(payload.test_cases)
        .structural_constraints(payload.structural_constraints)
        .task_marks(task_marks)
        .build();

    let report = state.get_evaluator().evaluate(request).await?;
    let response = report.to_response();
    tracing::info!("result: {}/{}", response.score, response.max_score);

    Ok((StatusCode::OK, Json(response)))
}

/// Handler for a single run without grading
pub async fn execute_quick(
    State(state): State<AppState>,
    payload: Result<Json<QuickExecuteRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let (code, language) = required_fields(payload.code, payload.language.as_deref())?;

    tracing::info!("quick execution: {}", language);

    let request = ExecutionRequest {
        language,
        source: code,
        stdin: payload.input.unwrap_or_default(),
        limits: payload.limits,
    };
    let result = state.get_dispatcher().submit(request).await?;

    Ok((StatusCode::OK, Json(QuickExecuteResponse::from(result))))
}

/// Handler listing the supported languages
pub async fn languages() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(LanguagesResponse {
            languages: Language::ALL.iter().map(Language::info).collect(),
        }),
    ))
}

/// Handler reporting the dispatcher's load
pub async fn status(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    Ok((StatusCode::OK, Json(state.get_dispatcher().stats())))
}

/// Fallback handler for unknown routes
pub async fn not_found() -> ServerError {
    ServerError::NotFound("Endpoint not found".to_string())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn required_fields(code: Option<String>, language: Option<&str>) -> ServerResult<(String, Language)> {
    let (Some(code), Some(language)) = (code.filter(|c| !c.is_empty()), language) else {
        return Err(ValidationError::MissingFields.into());
    };
    if language.is_empty() {
        return Err(ValidationError::MissingFields.into());
    }

    let language = language
        .parse::<Language>()
        .map_err(|_| ServerError::ValidationError(ValidationError::InvalidLanguage))?;

    Ok((code, language))
}

fn invalid_body(rejection: JsonRejection) -> ServerError {
    ServerError::ValidationError(ValidationError::InvalidInput(rejection.body_text()))
}
