//! Route handlers and the bearer-token extractors they use.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{self, Session},
    model::{Journey, JourneySummary, User},
    storage::asset_url,
    validate::{self, ValidatedJourney},
};

use super::{ApiError, AppState};

/// The user behind a valid bearer token.
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] whose role may mutate journeys.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?
            .to_string();
        let user = state
            .run(move |storage| auth::authenticate(storage, &token))
            .await?;
        Ok(Self(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        auth::require_mutation(&user)?;
        Ok(Self(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Decodes and validates a journey body.
fn journey_body(body: &Bytes) -> Result<ValidatedJourney, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Request body is not valid JSON: {e}")))?;
    validate::validate_json(&value).map_err(ApiError::Invalid)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .run(move |storage| auth::login(storage, &req.email, &req.password))
        .await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?
        .to_string();
    state.run(move |storage| auth::logout(storage, &token)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<JourneySummary>>, ApiError> {
    let journeys = state.run(|storage| storage.load_journeys()).await?;
    Ok(Json(journeys.iter().map(Journey::summary).collect()))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Journey>, ApiError> {
    let journey = state.run(move |storage| storage.load_journey(id)).await?;
    Ok(Json(journey))
}

pub async fn create_report(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Journey>), ApiError> {
    let validated = journey_body(&body)?;
    debug!(by = %user.email, "creating journey");
    let journey = state
        .run(move |storage| storage.insert_journey(validated.document()))
        .await?;
    Ok((StatusCode::CREATED, Json(journey)))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AdminUser(user): AdminUser,
    body: Bytes,
) -> Result<Json<Journey>, ApiError> {
    let validated = journey_body(&body)?;
    debug!(%id, by = %user.email, "updating journey");
    let journey = state
        .run(move |storage| storage.replace_journey(id, validated.document()))
        .await?;
    Ok(Json(journey))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AdminUser(user): AdminUser,
) -> Result<StatusCode, ApiError> {
    debug!(%id, by = %user.email, "deleting journey");
    state.run(move |storage| storage.remove_journey(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raster formats accepted for upload. SVG is refused.
const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Stores a raw image body; responds with the URL it is served from.
pub async fn upload(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Only {} uploads are accepted",
            IMAGE_TYPES.join(", ")
        )));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".into()));
    }
    let digest = state
        .run(move |storage| storage.put_asset(&body, &content_type))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "url": asset_url(&digest) }))))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<Response, ApiError> {
    let asset = state.run(move |storage| storage.get_asset(&digest)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        asset.bytes,
    )
        .into_response())
}
