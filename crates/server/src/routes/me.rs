//! The signed-in account's own profile.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
};

use super::auth::ProfileResponse;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::ProfileForm;
use crate::state::AppState;

/// Load the signed-in account's profile.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let profile = state.editor().load(user.id).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// Update the signed-in account's profile.
///
/// Multipart form with optional text fields `displayName` (or `name`), `age`,
/// `bio`, `instagram`, `tiktok`, `twitter` and an optional `photo` file.
/// Omitted fields are left unchanged.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>> {
    let form = read_form(multipart).await?;
    let profile = state.editor().update(&user, form).await?;
    Ok(Json(ProfileResponse { profile }))
}

fn bad_multipart(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {}", e.body_text()))
}

async fn read_form(mut multipart: Multipart) -> Result<ProfileForm> {
    let mut form = ProfileForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_multipart(&e))? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "photo" {
            let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
            let data = field.bytes().await.map_err(|e| bad_multipart(&e))?;
            // Browsers submit an empty part when no file was chosen.
            if has_file_name || !data.is_empty() {
                form.photo = Some(data);
            }
            continue;
        }

        let slot = match name.as_str() {
            "displayName" | "name" => &mut form.display_name,
            "age" => &mut form.age,
            "bio" => &mut form.bio,
            "instagram" => &mut form.instagram,
            "tiktok" => &mut form.tiktok,
            "twitter" => &mut form.twitter,
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(|e| bad_multipart(&e))?);
    }

    Ok(form)
}
