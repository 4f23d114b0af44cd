use crate::engine::Reference;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use facecheck_core::{MatchDecision, FIRST_LABEL, SECOND_LABEL};
use std::collections::HashSet;

/// Form field holding the image to identify.
pub const CAPTURED_FIELD: &str = "captured_image";

/// Files pulled out of one multipart upload.
#[derive(Debug, Default)]
struct Upload {
    image1: Option<Vec<u8>>,
    image2: Option<Vec<u8>>,
    captured: Option<Vec<u8>>,
}

/// `POST /compare`: match `captured_image` against `image1` / `image2`.
///
/// Either reference may be omitted, but not both, and each image field may
/// appear at most once. Uploads are kept in memory for the duration of the
/// request only.
pub async fn compare_images(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<MatchDecision>> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let limit_mb = state.config.max_upload_mb;
    let mut upload = Upload::default();
    let mut seen = HashSet::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::from_multipart(e, limit_mb))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let (key, slot) = match name.as_str() {
            FIRST_LABEL => (FIRST_LABEL, &mut upload.image1),
            SECOND_LABEL => (SECOND_LABEL, &mut upload.image2),
            CAPTURED_FIELD => (CAPTURED_FIELD, &mut upload.captured),
            _ => {
                tracing::debug!(field = %name, "ignoring unknown form field");
                continue;
            }
        };
        if !seen.insert(key) {
            return Err(ServerError::BadRequest(format!("Duplicate field: {key}")));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::from_multipart(e, limit_mb))?;
        // An empty file input is the same as not sending it.
        if !bytes.is_empty() {
            *slot = Some(bytes.to_vec());
        }
    }

    let first = upload.image1.map(|b| Reference::new(FIRST_LABEL, b));
    let second = upload.image2.map(|b| Reference::new(SECOND_LABEL, b));
    if first.is_none() && second.is_none() {
        return Err(ServerError::BadRequest(
            "At least one of image1 or image2 must be provided.".into(),
        ));
    }
    let captured = upload
        .captured
        .ok_or_else(|| ServerError::BadRequest("Captured image is required.".into()))?;

    tracing::debug!(
        captured_bytes = captured.len(),
        image1 = first.is_some(),
        image2 = second.is_some(),
        "compare request"
    );

    let decision = state
        .engine
        .evaluate(&captured, first.as_ref(), second.as_ref())
        .await;
    Ok(Json(decision))
}
