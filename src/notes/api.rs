//! Notes API Endpoints
//! Mission: Per-user CRUD over notes, plus the folders and tags they point at

use crate::app::AppState;
use crate::auth::models::UserClaim;
use crate::error::ApiError;
use crate::notes::models::{
    ensure_valid_id, Folder, NameRequest, NewNote, Note, NoteFilter, NoteUpdate, Tag,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn required_name(payload: Result<Json<NameRequest>, JsonRejection>) -> Result<String, ApiError> {
    payload
        .ok()
        .and_then(|Json(body)| body.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing `name` in request body".to_string()))
}

/// GET /api/notes
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    query: Result<Query<NoteFilter>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(filter) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let notes = state.notes.list_notes(&user.id, filter).await?;
    Ok(Json(notes))
}

/// GET /api/notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    ensure_valid_id(&id, "The `id` is not valid")?;

    state
        .notes
        .get_note(&user.id, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let new_note = NewNote::from_json(&json_body(payload)?)?;

    state
        .ownership
        .validate(&user.id, new_note.folder_id.as_deref(), &new_note.tags)
        .await?;

    let note = state.notes.create_note(&user.id, new_note).await?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/api/notes/{}", note.id))],
        Json(note),
    ))
}

/// PUT /api/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    ensure_valid_id(&id, "The `note id` is not valid")?;
    let update = NoteUpdate::from_json(&json_body(payload)?)?;

    let tags = update.tags.as_deref().unwrap_or_default();
    state
        .ownership
        .validate(&user.id, update.folder_id(), tags)
        .await?;

    state
        .notes
        .update_note(&user.id, &id, update)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// DELETE /api/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_valid_id(&id, "The `id` is not valid")?;

    if state.notes.delete_note(&user.id, &id).await? {
        info!(note_id = %id, user_id = %user.id, "Deleted note");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/folders
pub async fn list_folders(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    Ok(Json(state.notes.list_folders(&user.id).await?))
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required_name(payload)?;
    let folder = state.notes.create_folder(&user.id, &name).await?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/api/folders/{}", folder.id))],
        Json(folder),
    ))
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.notes.list_tags(&user.id).await?))
}

/// POST /api/tags
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(user): Extension<UserClaim>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required_name(payload)?;
    let tag = state.notes.create_tag(&user.id, &name).await?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/api/tags/{}", tag.id))],
        Json(tag),
    ))
}
