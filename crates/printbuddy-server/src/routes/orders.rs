use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use bytes::BytesMut;
use printbuddy_core::Submission;
use printbuddy_store::StageError;
use serde_json::{json, Value};
use tracing::debug;

use super::AppState;
use crate::error::ApiError;
use crate::intake::UploadedFile;

/// Multipart field carrying the order file.
pub const FILE_FIELD: &str = "file";

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/orders", post(create_order))
}

fn too_large(limit: usize) -> ApiError {
    ApiError::BadRequest(
        StageError::TooLarge {
            limit,
            actual: limit.saturating_add(1),
        }
        .to_string(),
    )
}

fn multipart_error(e: MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Read a file part, keeping at most `limit + 1` bytes. The rest is
/// drained so the stager can still report the size violation.
async fn read_file(mut field: Field<'_>, limit: usize) -> Result<UploadedFile, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let keep = limit.saturating_add(1);
    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if data.len() < keep {
            let take = (keep - data.len()).min(chunk.len());
            data.extend_from_slice(&chunk[..take]);
        }
    }
    Ok(UploadedFile {
        file_name,
        content_type,
        data: data.freeze(),
    })
}

/// Split a multipart body into text fields and the first `file` part.
/// Other file parts, and file parts without a file name (an unfilled file
/// input), are drained and ignored.
async fn read_order_form(
    mut multipart: Multipart,
    limit: usize,
) -> Result<(Submission, Option<UploadedFile>), ApiError> {
    let mut submission = Submission::new();
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
        if name == FILE_FIELD && file.is_none() && has_file_name {
            file = Some(read_file(field, limit).await?);
        } else if field.file_name().is_some() {
            debug!(field = %name, "ignoring extra file part");
            read_file(field, 0).await?;
        } else {
            let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
            submission.insert(name, value);
        }
    }
    Ok((submission, file))
}

async fn create_order(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let limit = state.intake.upload_limit();
    let (submission, file) = match multipart {
        Ok(multipart) => read_order_form(multipart, limit).await?,
        // Not a multipart body: no file, and no fields to read.
        Err(rejection) => {
            debug!("order without multipart body: {}", rejection.body_text());
            (Submission::new(), None)
        }
    };
    state.intake.submit_order(&submission, file).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order submitted successfully" })),
    ))
}
