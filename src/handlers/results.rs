// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::Stores, utils::jwt::Claims};

#[derive(Debug, Deserialize)]
pub struct ResultListParams {
    pub test_id: Option<i64>,
}

/// Lists the current user's stored results, newest first.
pub async fn list_my_results(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let results = stores
        .results
        .list_for_user(claims.user_id(), params.test_id)
        .await?;
    Ok(Json(results))
}

/// Full result with the per-question breakdown, for the review screen.
/// Owner only; admins may read any result.
pub async fn get_result(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = stores
        .results
        .fetch_result(result_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;

    if result.user_id != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "Result belongs to another user".to_string(),
        ));
    }

    Ok(Json(result))
}
