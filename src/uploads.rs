//! Multipart product form parsing and image persistence.

use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::AppError;

/// At most this many `images` parts per request.
pub const MAX_IMAGES: usize = 5;
/// Per-file size cap.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Text fields plus the `/uploads/...` paths of files written to disk.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: HashMap<String, String>,
    pub image_paths: Vec<String>,
}

impl ProductForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|s| !s.trim().is_empty())
    }
}

/// Drain a multipart request: `images` parts are validated and written to
/// `upload_dir` under generated names; everything else is collected as text.
pub async fn read_product_form(
    mut multipart: Multipart,
    upload_dir: &Path,
) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            if form.image_paths.len() >= MAX_IMAGES {
                return Err(AppError::BadRequest(format!(
                    "at most {MAX_IMAGES} images per product"
                )));
            }
            let ext = image_extension(field.file_name(), field.content_type())?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("image upload: {e}")))?;
            if data.len() > MAX_IMAGE_BYTES {
                return Err(AppError::BadRequest("image exceeds 5 MiB limit".into()));
            }
            if data.is_empty() {
                return Err(AppError::BadRequest("image part is empty".into()));
            }
            let file_name = format!("{}.{}", Uuid::new_v4(), ext);
            tokio::fs::create_dir_all(upload_dir)
                .await
                .map_err(|e| AppError::Internal(format!("upload dir: {e}")))?;
            tokio::fs::write(upload_dir.join(&file_name), &data)
                .await
                .map_err(|e| AppError::Internal(format!("write image: {e}")))?;
            form.image_paths.push(format!("/uploads/{file_name}"));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("multipart: {e}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Images only: jpeg, jpg, png, webp. Both the file extension and (when
/// present) the content type must pass.
fn image_extension(file_name: Option<&str>, content_type: Option<&str>) -> Result<String, AppError> {
    let ext = file_name
        .and_then(|n| n.rsplit('.').next())
        .map(str::to_ascii_lowercase)
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| AppError::BadRequest("images only (jpeg, jpg, png, webp)".into()))?;
    if let Some(ct) = content_type {
        if !ALLOWED_CONTENT_TYPES.contains(&ct) {
            return Err(AppError::BadRequest("images only (jpeg, jpg, png, webp)".into()));
        }
    }
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allowlist() {
        assert_eq!(image_extension(Some("a.PNG"), Some("image/png")).unwrap(), "png");
        assert_eq!(image_extension(Some("photo.jpeg"), None).unwrap(), "jpeg");
        assert!(image_extension(Some("a.gif"), Some("image/gif")).is_err());
        assert!(image_extension(Some("noext"), None).is_err());
        assert!(image_extension(None, Some("image/png")).is_err());
        // Extension ok but content type lies.
        assert!(image_extension(Some("a.png"), Some("application/zip")).is_err());
    }
}
