use axum::extract::{Multipart, State};
use axum::Json;

use crate::auth::session::SessionSnapshot;
use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{PhotoUpload, MAX_PHOTO_BYTES};

/// PUT /api/v1/profile
/// Multipart form: optional `display_name` text field, optional `photo`
/// file part. The photo constraints live here, not in the upload adapter.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut display_name = None;
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "display_name" => {
                display_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid display_name: {e}")))?,
                );
            }
            "photo" => {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid photo: {e}")))?;
                validate_photo(&content_type, data.len())?;
                photo = Some(PhotoUpload {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(Json(
        state.sessions.update_profile(display_name, photo).await?,
    ))
}

fn validate_photo(content_type: &str, size: usize) -> Result<(), AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(
            "profile photo must be an image".to_string(),
        ));
    }
    if size > MAX_PHOTO_BYTES {
        return Err(AppError::Validation(
            "profile photo must be 5 MB or smaller".to_string(),
        ));
    }
    Ok(())
}
