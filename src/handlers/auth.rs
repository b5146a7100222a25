// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::SyncUserRequest,
    state::Stores,
    utils::jwt::sign_jwt,
};

/// Syncs an externally authenticated identity into the platform.
///
/// The identity provider (Firebase) has already verified the credential;
/// this endpoint upserts the application user record keyed on the provider
/// uid and issues the session token the exam endpoints require. Called once
/// per session to resolve the application user id.
pub async fn sync(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Json(payload): Json<SyncUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = stores.users.sync_user(&payload).await?;

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("Synced user {} ({})", user.id, user.email);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}
