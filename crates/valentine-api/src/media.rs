use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use valentine_db::assets::NewAsset;
use valentine_types::api::{Claims, UploadResponse};
use valentine_types::models::MediaType;

use crate::error::{ApiError, ApiResult};
use crate::pages::owned_page;
use crate::state::{AppState, with_db};
use crate::storage::extension_for;

pub struct UploadedFile {
    pub content_type: String,
    pub data: Bytes,
}

/// A parsed multipart form: the `file` part plus every text field.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Trimmed, non-empty text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

pub async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> ApiResult<UploadForm> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            if data.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge);
            }
            form.file = Some(UploadedFile { content_type, data });
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
}

/// How a gallery or timeline item shows the file. `None` for anything that
/// is neither an image nor a video.
pub fn media_type_for(content_type: &str) -> Option<MediaType> {
    if content_type.starts_with("image/") {
        Some(MediaType::Image)
    } else if content_type.starts_with("video/") {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Writes the file to storage and records it as an asset of `page_id`. If
/// the record cannot be written the file is removed again.
pub async fn store_upload(state: &AppState, page_id: Uuid, file: UploadedFile) -> ApiResult<StoredAsset> {
    if file.data.is_empty() {
        return Err(ApiError::BadRequest("file is empty".into()));
    }
    let ext = extension_for(&file.content_type).ok_or_else(|| {
        ApiError::BadRequest(format!("unsupported file type '{}'", file.content_type))
    })?;
    let id = Uuid::new_v4();
    let file_name = format!("{}.{}", id, ext);
    let url = state.storage.url_for(&file_name);

    let sha256 = state.storage.save(&file_name, &file.data).await.map_err(|e| {
        error!("Failed to write media file {}: {}", file_name, e);
        ApiError::Internal(e)
    })?;

    let (aid, pid, name, link, content_type) = (
        id.to_string(),
        page_id.to_string(),
        file_name.clone(),
        url.clone(),
        file.content_type.clone(),
    );
    let size = file.data.len() as i64;
    let recorded = with_db(state, move |db| {
        db.insert_asset(&NewAsset {
            id: &aid,
            page_id: &pid,
            file_name: &name,
            url: &link,
            content_type: &content_type,
            size,
            sha256: &sha256,
        })
    })
    .await;

    if let Err(e) = recorded {
        if let Err(cleanup) = state.storage.delete_file(&file_name).await {
            warn!("Could not remove unrecorded media file {}: {}", file_name, cleanup);
        }
        return Err(e);
    }

    info!("Stored {} ({} bytes) for page {}", file_name, size, page_id);
    Ok(StoredAsset {
        id,
        file_name,
        url,
    })
}

/// Removes an asset row and its file; used to undo a half-finished upload.
pub async fn discard_asset(state: &AppState, asset: &StoredAsset) {
    let id = asset.id.to_string();
    if let Err(e) = with_db(state, move |db| db.delete_asset(&id)).await {
        warn!("Could not delete asset row {}: {}", asset.id, e);
    }
    if let Err(e) = state.storage.delete_file(&asset.file_name).await {
        warn!("Could not delete media file {}: {}", asset.file_name, e);
    }
}

/// Deletes the asset behind `url` once nothing on the page refers to it.
/// Failures are logged only; the caller's change has already been applied.
pub async fn release_asset(state: &AppState, page_id: &str, url: &str) {
    let (pid, link) = (page_id.to_string(), url.to_string());
    let released = with_db(state, move |db| {
        let Some(asset) = db.get_asset_by_url(&pid, &link)? else {
            return Ok(None);
        };
        if db.is_asset_referenced(&pid, &link)? {
            return Ok(None);
        }
        db.delete_asset(&asset.id)?;
        Ok(Some(asset))
    })
    .await;

    match released {
        Ok(Some(asset)) => {
            if let Err(e) = state.storage.delete_file(&asset.file_name).await {
                warn!("Could not delete media file {}: {}", asset.file_name, e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Could not release asset {}: {}", url, e),
    }
}

/// POST /api/media: multipart `file` + `page_id`; returns the asset URL.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;

    let page_id: Uuid = form
        .field("page_id")
        .ok_or_else(|| ApiError::BadRequest("page_id is required".into()))?
        .parse()
        .map_err(|_| ApiError::BadRequest("page_id is not a valid id".into()))?;
    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::BadRequest("file is required".into()))?;

    let page = owned_page(&state, &claims).await?;
    if page.page_id()? != page_id {
        return Err(ApiError::Forbidden("page belongs to another account".into()));
    }

    let asset = store_upload(&state, page_id, file).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            asset_id: asset.id,
            url: asset.url,
        }),
    ))
}
