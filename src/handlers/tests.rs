// src/handlers/tests.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::test::PublicTest,
    state::Stores,
};

/// Lists the test catalog (no question payloads).
pub async fn list_tests(State(stores): State<Stores>) -> Result<impl IntoResponse, AppError> {
    let tests = stores.tests.list_tests().await?;
    Ok(Json(tests))
}

/// Fetches one test paper for the exam client.
///
/// Answer keys and analytics tags never leave the server: the definition is
/// mapped through `PublicTest`, which also sanitizes stored rich text.
pub async fn get_test(
    State(stores): State<Stores>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let test = stores
        .tests
        .fetch_test(test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test {} not found", test_id)))?;

    Ok(Json(PublicTest::from(&test)))
}
