use axum::{Extension, Json, extract::State};
use tracing::info;

use valentine_db::models::PageRow;
use valentine_types::api::{Claims, PageResponse, PublishRequest};
use valentine_types::models::PageSettings;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::media::release_asset;
use crate::state::{AppState, with_db};

/// The page owned by the authenticated account.
pub async fn owned_page(state: &AppState, claims: &Claims) -> ApiResult<PageRow> {
    let owner = claims.sub.to_string();
    with_db(state, move |db| db.get_page_by_owner(&owner))
        .await?
        .ok_or(ApiError::NotFound("page"))
}

fn page_response(page: PageRow) -> ApiResult<PageResponse> {
    Ok(PageResponse {
        id: page.page_id()?,
        settings: page.parsed_settings()?,
        updated_at: page.updated_at(),
        is_published: page.is_published,
        username: page.username,
    })
}

pub async fn get_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<PageResponse>> {
    let page = owned_page(&state, &claims).await?;
    Ok(Json(page_response(page)?))
}

/// Replaces the page settings wholesale. A music track that is no longer
/// referenced is released.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(settings): ApiJson<PageSettings>,
) -> ApiResult<Json<PageResponse>> {
    let page = owned_page(&state, &claims).await?;
    let previous = page.parsed_settings()?;

    let page_id = page.id.clone();
    let updated = with_db(&state, move |db| {
        if !db.update_page_settings(&page_id, &settings)? {
            return Ok(None);
        }
        db.get_page(&page_id)
    })
    .await?
    .ok_or(ApiError::NotFound("page"))?;

    if let Some(old) = previous.music_url.as_deref() {
        if updated.parsed_settings()?.music_url.as_deref() != Some(old) {
            release_asset(&state, &updated.id, old).await;
        }
    }

    info!("Page {} settings updated", updated.id);
    Ok(Json(page_response(updated)?))
}

pub async fn set_publish(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PublishRequest>,
) -> ApiResult<Json<PageResponse>> {
    let page = owned_page(&state, &claims).await?;

    let page_id = page.id.clone();
    let published = req.published;
    let updated = with_db(&state, move |db| {
        if !db.set_published(&page_id, published)? {
            return Ok(None);
        }
        db.get_page(&page_id)
    })
    .await?
    .ok_or(ApiError::NotFound("page"))?;

    info!(
        "Page {} {}",
        updated.id,
        if published { "published" } else { "unpublished" }
    );
    Ok(Json(page_response(updated)?))
}
