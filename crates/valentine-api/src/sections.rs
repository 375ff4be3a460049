use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use valentine_db::models::SectionItemRow;
use valentine_types::api::{Claims, ReorderRequest};
use valentine_types::models::{MediaType, SectionContent, SectionItem, SectionKind};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::media::{UploadForm, discard_asset, media_type_for, read_form, release_asset, store_upload};
use crate::pages::owned_page;
use crate::state::{AppState, with_db};

fn parse_kind(raw: &str) -> ApiResult<SectionKind> {
    raw.parse().map_err(|_| ApiError::NotFound("section kind"))
}

fn parse_item_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::NotFound("item"))
}

/// Decodes an item body for the collection in the path. The `kind` tag may be
/// omitted; if present it has to match.
fn parse_content(kind: SectionKind, mut body: serde_json::Value) -> ApiResult<SectionContent> {
    let Some(fields) = body.as_object_mut() else {
        return Err(ApiError::BadRequest("expected a JSON object".into()));
    };
    fields
        .entry("kind")
        .or_insert_with(|| serde_json::Value::String(kind.as_str().to_string()));

    let content: SectionContent =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    content.validate(kind)?;
    Ok(content)
}

fn into_items(rows: Vec<SectionItemRow>) -> ApiResult<Vec<SectionItem>> {
    rows.into_iter()
        .map(|row| row.into_item().map_err(ApiError::from))
        .collect()
}

pub async fn list_sections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<SectionItem>>> {
    let kind = parse_kind(&kind)?;
    let page = owned_page(&state, &claims).await?;

    let rows = with_db(&state, move |db| db.list_sections(&page.id, Some(kind))).await?;
    Ok(Json(into_items(rows)?))
}

/// Appends an item to the end of its collection.
pub async fn create_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let content = parse_content(kind, body)?;
    let page = owned_page(&state, &claims).await?;

    let id = Uuid::new_v4().to_string();
    let row = with_db(&state, move |db| db.insert_section(&id, &page.id, &content)).await?;

    info!("Added {} item {} at index {}", kind, row.id, row.order_index);
    Ok((StatusCode::CREATED, Json(row.into_item()?)))
}

/// Replaces an item's content. Media the item no longer points at is
/// released.
pub async fn update_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> ApiResult<Json<SectionItem>> {
    let kind = parse_kind(&kind)?;
    let item_id = parse_item_id(&id)?;
    let content = parse_content(kind, body)?;
    let page = owned_page(&state, &claims).await?;

    let (page_id, item, new_content) = (page.id.clone(), item_id.to_string(), content.clone());
    let previous = with_db(&state, move |db| {
        // An id from another collection is treated as missing.
        match db.get_section(&page_id, &item)? {
            Some(row) if row.kind == kind.as_str() => {}
            _ => return Ok(None),
        }
        db.update_section(&page_id, &item, &new_content)
    })
    .await?
    .ok_or(ApiError::NotFound("item"))?;

    let old_media = previous.media_url.clone();
    let mut updated = previous.into_item()?;
    updated.content = content;

    if let Some(old) = old_media.as_deref() {
        if updated.content.media_url() != Some(old) {
            release_asset(&state, &page.id, old).await;
        }
    }

    Ok(Json(updated))
}

pub async fn delete_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    let item_id = parse_item_id(&id)?;
    let page = owned_page(&state, &claims).await?;

    let (page_id, item) = (page.id.clone(), item_id.to_string());
    let deleted = with_db(&state, move |db| {
        match db.get_section(&page_id, &item)? {
            Some(row) if row.kind == kind.as_str() => {}
            _ => return Ok(None),
        }
        db.delete_section(&page_id, &item)
    })
    .await?
    .ok_or(ApiError::NotFound("item"))?;

    // Record first, then the asset.
    if let Some(url) = deleted.media_url.as_deref() {
        release_asset(&state, &page.id, url).await;
    }

    info!("Deleted {} item {}", kind, deleted.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Rewrites the order of a whole collection. `ids` must list every item of
/// the collection exactly once.
pub async fn reorder_sections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> ApiResult<Json<Vec<SectionItem>>> {
    let kind = parse_kind(&kind)?;
    let page = owned_page(&state, &claims).await?;

    let ids: Vec<String> = req.ids.iter().map(Uuid::to_string).collect();
    let rows = with_db(&state, move |db| {
        if !db.reorder_sections(&page.id, kind, &ids)? {
            return Ok(None);
        }
        db.list_sections(&page.id, Some(kind)).map(Some)
    })
    .await?
    .ok_or_else(|| {
        ApiError::BadRequest("ids must name every item of the collection exactly once".into())
    })?;

    Ok(Json(into_items(rows)?))
}

/// Multipart fields other than `file` that describe the new item.
fn content_from_form(
    kind: SectionKind,
    form: &UploadForm,
    media_url: String,
    media_type: MediaType,
) -> ApiResult<SectionContent> {
    let text = |name: &str| form.field(name).map(str::to_string);
    let content = match kind {
        SectionKind::Gallery => SectionContent::Gallery {
            media_url,
            caption: text("caption"),
            media_type,
        },
        SectionKind::Timeline => SectionContent::Timeline {
            title: text("title").unwrap_or_default(),
            description: text("description"),
            event_date: form
                .field("event_date")
                .map(|raw| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                        ApiError::BadRequest("event_date must be YYYY-MM-DD".into())
                    })
                })
                .transpose()?,
            media_url: Some(media_url),
        },
        _ => {
            return Err(ApiError::BadRequest(format!("{} items do not take uploads", kind)));
        }
    };
    content.validate(kind)?;
    Ok(content)
}

/// Stores the uploaded file and creates the item pointing at it in one
/// request. If the item cannot be created the file is removed again.
pub async fn upload_and_create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    if !kind.takes_media() {
        return Err(ApiError::BadRequest(format!("{} items do not take uploads", kind)));
    }

    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
    let media_type = match (kind, media_type_for(&file.content_type)) {
        (SectionKind::Gallery, Some(media_type)) => media_type,
        (SectionKind::Timeline, Some(MediaType::Image)) => MediaType::Image,
        (SectionKind::Timeline, _) => {
            return Err(ApiError::BadRequest("timeline items take images only".into()));
        }
        _ => {
            return Err(ApiError::BadRequest(format!(
                "{} items take images or videos, not '{}'",
                kind, file.content_type
            )));
        }
    };

    // Reject bad fields before anything is written.
    content_from_form(kind, &form, "pending".into(), media_type)?;

    let page = owned_page(&state, &claims).await?;
    let asset = store_upload(&state, page.page_id()?, file).await?;
    let content = content_from_form(kind, &form, asset.url.clone(), media_type)?;

    let (id, page_id) = (Uuid::new_v4().to_string(), page.id.clone());
    let inserted = with_db(&state, move |db| db.insert_section(&id, &page_id, &content)).await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            warn!("Creating {} item failed, discarding asset {}", kind, asset.id);
            discard_asset(&state, &asset).await;
            return Err(e);
        }
    };

    info!("Added {} item {} with media {}", kind, row.id, asset.url);
    Ok((StatusCode::CREATED, Json(row.into_item()?)))
}
