/// Authentication endpoints
///
/// - `POST /auth/register` - Create an account and get a token
/// - `POST /auth/login` - Exchange credentials for a token

use crate::{app::AppState, error::ApiResult};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use taskdesk_shared::services::auth::{AuthResponse, LoginRequest, RegisterRequest};

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "password": "correct horse battery"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "token": "eyJ...",
///   "user": { "id": "uuid", "name": "Ada Lovelace", "email": "ada@example.com", "createdOn": "..." }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint
///
/// Same response shape as registration.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    Ok(Json(state.auth_service.login(req).await?))
}
