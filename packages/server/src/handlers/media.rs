use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use common::storage::ContentHash;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/media/{hash}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Serve a stored image by content hash",
    params(("hash" = String, Path, description = "Hex SHA-256 content hash")),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/*"),
        (status = 400, description = "Malformed hash (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such image (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(hash = %hash))]
pub async fn get_media(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let hash = ContentHash::from_hex(&hash)?;
    let bytes = state.media.get(&hash).await?;
    let content_type = sniff_image_type(&bytes);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            // Content-addressed: the bytes behind a hash never change.
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable",
            ),
        ],
        bytes,
    ))
}

/// Detect the image format from magic bytes. The store keys by content hash,
/// so there is no file extension to go by.
fn sniff_image_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}
