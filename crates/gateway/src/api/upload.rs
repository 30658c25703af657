//! `POST /upload`, `POST /upload-async`, `GET /upload-status/{session_id}`
//! (spec §4.8, C8). Both upload endpoints share one pipeline: stage the file
//! to a temp path, mark it on the session, force the dispatcher onto step 34
//! (the photo step) so the model calls `upload_photo_to_s3` and
//! `update_photo_link_to_db` itself, then clean up. The sync endpoint awaits
//! that pipeline inline; the async one spawns it and reports status through
//! `UploadStatusStore`, mirroring the teacher's background-task split.

use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Json};
use std::io::Write;

use club_domain::session::{LastAgent, PendingUpload};
use club_photo::{validate_upload, UploadStatus};

use crate::api::chat::{dispatch, DispatchResult};
use crate::state::AppState;

/// Server-internal step the routine reaches when it's time to collect the
/// player photo (spec §4.6 step 34).
const PHOTO_STEP: u8 = 34;

struct StagedUpload {
    temp_path: String,
    content_type: String,
    original_name: String,
}

async fn stage_multipart(mut multipart: Multipart) -> Result<(String, StagedUpload), String> {
    let mut session_id: Option<String> = None;
    let mut staged: Option<StagedUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        match field.name() {
            Some("session_id") => {
                session_id = Some(field.text().await.map_err(|e| e.to_string())?);
            }
            Some("file") => {
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;

                validate_upload(&content_type, bytes.len()).map_err(|e| e.to_string())?;

                let extension = original_name.rsplit('.').next().unwrap_or("bin");
                let mut temp = tempfile::Builder::new()
                    .suffix(&format!(".{extension}"))
                    .tempfile()
                    .map_err(|e| e.to_string())?;
                temp.write_all(&bytes).map_err(|e| e.to_string())?;
                let (_, path) = temp.keep().map_err(|e| e.to_string())?;

                staged = Some(StagedUpload {
                    temp_path: path.to_string_lossy().to_string(),
                    content_type,
                    original_name,
                });
            }
            _ => {}
        }
    }

    let session_id = session_id.ok_or_else(|| "missing session_id field".to_string())?;
    let staged = staged.ok_or_else(|| "missing file field".to_string())?;
    Ok((session_id, staged))
}

/// Runs the staged upload through one forced-step-34 dispatch round-trip,
/// then clears the pending-upload marker and removes the temp file
/// regardless of outcome.
async fn run_photo_turn(state: &AppState, session_id: String, staged: StagedUpload) -> Result<DispatchResult, String> {
    state
        .sessions
        .set_pending_upload(
            &session_id,
            Some(PendingUpload {
                temp_path: staged.temp_path.clone(),
                original_name: staged.original_name.clone(),
                content_type: staged.content_type.clone(),
            }),
        )
        .map_err(|e| e.to_string())?;

    state
        .sessions
        .append(
            &session_id,
            club_domain::message::Message::system(format!("UPLOADED_FILE_PATH:{}", staged.temp_path)),
        )
        .map_err(|e| e.to_string())?;

    let user_message = format!(
        "I've uploaded the photo ({}, {}).",
        staged.original_name, staged.content_type
    );

    let result = dispatch(
        state,
        session_id.clone(),
        user_message,
        Some(PHOTO_STEP),
        Some(LastAgent::NewRegistration),
        0,
    )
    .await;

    let _ = state.sessions.set_pending_upload(&session_id, None);
    let _ = std::fs::remove_file(&staged.temp_path);

    result
}

/// `POST /upload` — synchronous: blocks until the model has processed the
/// photo and returns its step-34 reply.
pub async fn upload_photo(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let (session_id, staged) = match stage_multipart(multipart).await {
        Ok(v) => v,
        Err(e) => return Json(serde_json::json!({ "error": e })).into_response(),
    };

    let _permit = match state.photo_workers.reserve(&session_id).await {
        Ok(p) => p,
        Err(e) => return Json(serde_json::json!({ "error": e.to_string() })).into_response(),
    };

    match run_photo_turn(&state, session_id.clone(), staged).await {
        Ok(result) => Json(serde_json::json!({
            "session_id": session_id,
            "response": result.text,
            "routine_number": result.routine_number,
        }))
        .into_response(),
        Err(e) => Json(serde_json::json!({ "session_id": session_id, "error": e })).into_response(),
    }
}

/// `POST /upload-async` — stages the file inline (cheap), then spawns the
/// model round-trip in the background and returns immediately. Progress is
/// polled via `GET /upload-status/{session_id}`.
pub async fn upload_photo_async(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let (session_id, staged) = match stage_multipart(multipart).await {
        Ok(v) => v,
        Err(e) => return Json(serde_json::json!({ "error": e })).into_response(),
    };

    state.upload_status.set(&session_id, UploadStatus::pending());

    let background_state = state.clone();
    let background_session_id = session_id.clone();
    tokio::spawn(async move {
        let guard = match background_state.photo_workers.reserve(&background_session_id).await {
            Ok(g) => g,
            Err(e) => {
                background_state.upload_status.set(&background_session_id, UploadStatus::failed(e.to_string()));
                return;
            }
        };

        let outcome = run_photo_turn(&background_state, background_session_id.clone(), staged).await;
        drop(guard);

        match outcome {
            Ok(result) => background_state.upload_status.set(&background_session_id, UploadStatus::done(result.text)),
            Err(e) => background_state.upload_status.set(&background_session_id, UploadStatus::failed(e)),
        }
    });

    Json(serde_json::json!({
        "processing": true,
        "response": "Thanks — processing the photo now, check back shortly.",
        "session_id": session_id,
    }))
    .into_response()
}

/// `GET /upload-status/{session_id}`
pub async fn upload_status(State(state): State<AppState>, Path(session_id): Path<String>) -> impl IntoResponse {
    match state.upload_status.get(&session_id) {
        Some(status) => Json(serde_json::json!({
            "complete": status.complete,
            "message": status.message,
            "error": status.error,
        }))
        .into_response(),
        None => Json(serde_json::json!({ "complete": false, "message": "no upload recorded for this session" }))
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::config::Config;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::from_config(Arc::new(Config::default()))
    }

    #[tokio::test]
    async fn upload_status_defaults_to_incomplete_for_unknown_session() {
        let state = state();
        let response = upload_status(State(state), Path("no-such-session".to_string())).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn upload_status_reports_recorded_completion() {
        let state = state();
        state.upload_status.set("s1", UploadStatus::done("all set"));
        let status = state.upload_status.get("s1").unwrap();
        assert!(status.complete);
        assert_eq!(status.message, "all set");
    }

    #[tokio::test]
    async fn photo_worker_pool_rejects_second_concurrent_upload_for_same_session() {
        let state = state();
        let _guard = state.photo_workers.reserve("s1").await.unwrap();
        assert!(state.photo_workers.reserve("s1").await.is_err());
    }
}
