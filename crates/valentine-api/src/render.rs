//! Server-rendered views: the public page, its "coming soon" and "not found"
//! fallbacks, the owner's preview and the login form.

use askama::Template;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Cookie, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use valentine_db::models::PageRow;
use valentine_reveal::{
    Choreography, LoveBook, Page, Particle, SwipeDeck, burst::BURST_SIZE, burst_layout,
    book::FLIP_DURATION, deck::{STACK_DEPTH, SWIPE_THRESHOLD}, reveal::VIRUS_DURATION,
};
use valentine_types::api::PublicPageResponse;
use valentine_types::models::{MediaType, PageSections, PageSettings, SectionContent, days_label};

use crate::auth::issue_token;
use crate::error::{ApiError, ApiResult};
use crate::middleware::verify_token;
use crate::state::{AppState, with_db};

fn render<T: Template>(t: T) -> ApiResult<Html<String>> {
    t.render()
        .map(Html)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("template render failed: {}", e)))
}

// -- View models --

pub struct CardView {
    pub media_url: String,
    pub caption: Option<String>,
    pub is_video: bool,
    /// Position in the initial stack; `STACK_DEPTH` for cards not drawn yet.
    pub depth: usize,
}

pub struct TimelineView {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub media_url: Option<String>,
}

pub struct BucketView {
    pub title: String,
    pub completed: bool,
}

pub struct NoteView {
    pub title: Option<String>,
    pub content: String,
}

#[derive(Clone)]
pub struct PoemView {
    pub title: String,
    pub lines: Vec<String>,
}

pub struct CouponView {
    pub title: String,
    pub description: Option<String>,
    pub redeemed: bool,
}

/// Parameters the page script needs to drive the widgets.
#[derive(Serialize)]
struct ClientConfig {
    choreography: Choreography,
    burst: Vec<Particle>,
    burst_images: Vec<String>,
    swipe_threshold: f32,
    stack_depth: usize,
    flip_ms: u64,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub username: String,
    pub settings: PageSettings,
    pub preview: bool,
    pub days: Option<String>,
    pub gallery: Vec<CardView>,
    pub timeline: Vec<TimelineView>,
    pub reasons: Vec<String>,
    pub bucket_list: Vec<BucketView>,
    pub notes: Vec<NoteView>,
    pub poems: Vec<PoemView>,
    /// `None` shows the cover on the left page.
    pub book_left: Option<PoemView>,
    pub book_right: Option<PoemView>,
    pub coupons: Vec<CouponView>,
    pub config_json: String,
}

#[derive(Template)]
#[template(path = "coming_soon.html")]
pub struct ComingSoonTemplate {
    pub recipient_name: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub username: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

/// JSON for an inline `<script>`; `<` is escaped so the payload cannot close
/// the tag.
fn script_json<T: Serialize>(value: &T) -> ApiResult<String> {
    let json = serde_json::to_string(value).map_err(anyhow::Error::from)?;
    Ok(json.replace('<', "\\u003c"))
}

pub fn page_template(
    username: String,
    settings: PageSettings,
    mut sections: PageSections,
    preview: bool,
) -> ApiResult<PageTemplate> {
    sections.retain_visible(&settings);

    let deck = SwipeDeck::new(sections.gallery.len());
    let stack = deck.visible_stack();
    let mut burst_images = Vec::new();
    let gallery: Vec<CardView> = sections
        .gallery
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match &item.content {
            SectionContent::Gallery {
                media_url,
                caption,
                media_type,
            } => {
                if *media_type == MediaType::Image {
                    burst_images.push(media_url.clone());
                }
                Some(CardView {
                    media_url: media_url.clone(),
                    caption: caption.clone(),
                    is_video: *media_type == MediaType::Video,
                    depth: stack.iter().position(|&s| s == i).unwrap_or(STACK_DEPTH),
                })
            }
            _ => None,
        })
        .collect();

    let timeline = sections
        .timeline
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::Timeline {
                title,
                description,
                event_date,
                media_url,
            } => Some(TimelineView {
                title: title.clone(),
                description: description.clone(),
                date: event_date.map(|d| d.format("%B %-d, %Y").to_string()),
                media_url: media_url.clone(),
            }),
            _ => None,
        })
        .collect();

    let reasons = sections
        .reasons
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::Reason { text } => Some(text.clone()),
            _ => None,
        })
        .collect();

    let bucket_list = sections
        .bucket_list
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::BucketList { title, completed } => Some(BucketView {
                title: title.clone(),
                completed: *completed,
            }),
            _ => None,
        })
        .collect();

    let notes = sections
        .notes
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::Note { title, content } => Some(NoteView {
                title: title.clone(),
                content: content.clone(),
            }),
            _ => None,
        })
        .collect();

    let poems: Vec<PoemView> = sections
        .poems
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::Poem { title, content } => Some(PoemView {
                title: title.clone(),
                lines: content.lines().map(str::to_string).collect(),
            }),
            _ => None,
        })
        .collect();

    let spread = LoveBook::new(poems.len()).spread();
    let book_left = match spread.left {
        Page::Cover => None,
        Page::Entry(i) => poems.get(i).cloned(),
    };
    let book_right = spread.right.and_then(|i| poems.get(i).cloned());

    let coupons = sections
        .coupons
        .iter()
        .filter_map(|item| match &item.content {
            SectionContent::Coupon {
                title,
                description,
                redeemed,
            } => Some(CouponView {
                title: title.clone(),
                description: description.clone(),
                redeemed: *redeemed,
            }),
            _ => None,
        })
        .collect();

    let days = settings
        .show_counter
        .then(|| settings.days_together(Utc::now().date_naive()))
        .flatten()
        .map(days_label);

    let config = ClientConfig {
        choreography: Choreography::new(VIRUS_DURATION),
        burst: burst_layout(&mut rand::rng(), BURST_SIZE, burst_images.len()),
        burst_images,
        swipe_threshold: SWIPE_THRESHOLD,
        stack_depth: STACK_DEPTH,
        flip_ms: FLIP_DURATION.as_millis() as u64,
    };

    Ok(PageTemplate {
        username,
        settings,
        preview,
        days,
        gallery,
        timeline,
        reasons,
        bucket_list,
        notes,
        poems,
        book_left,
        book_right,
        coupons,
        config_json: script_json(&config)?,
    })
}

/// A page with everything on it, in display order.
struct Aggregate {
    page: PageRow,
    settings: PageSettings,
    sections: PageSections,
}

async fn load_aggregate(state: &AppState, lookup: Lookup) -> ApiResult<Option<Aggregate>> {
    let Some((page, rows)) = with_db(state, move |db| {
        let page = match &lookup {
            Lookup::Username(name) => db.get_page_by_username(name)?,
            Lookup::Owner(owner) => db.get_page_by_owner(owner)?,
        };
        let Some(page) = page else {
            return Ok(None);
        };
        let rows = db.list_sections(&page.id, None)?;
        Ok(Some((page, rows)))
    })
    .await?
    else {
        return Ok(None);
    };

    let items = rows
        .into_iter()
        .map(|row| row.into_item())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(Aggregate {
        settings: page.parsed_settings()?,
        sections: PageSections::from_items(items),
        page,
    }))
}

enum Lookup {
    Username(String),
    Owner(String),
}

fn not_found(username: String) -> ApiResult<Response> {
    let html = render(NotFoundTemplate { username })?;
    Ok((StatusCode::NOT_FOUND, html).into_response())
}

/// GET /u/{username}
pub async fn public_page(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Response> {
    let Some(agg) = load_aggregate(&state, Lookup::Username(username.clone())).await? else {
        debug!("No page for {}", username);
        return not_found(username);
    };

    if !agg.page.is_published {
        let html = render(ComingSoonTemplate {
            recipient_name: agg.settings.recipient_name,
        })?;
        return Ok(html.into_response());
    }

    let view = page_template(agg.page.username, agg.settings, agg.sections, false)?;
    Ok(render(view)?.into_response())
}

/// GET /api/public/{username}
pub async fn public_page_json(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicPageResponse>> {
    let agg = load_aggregate(&state, Lookup::Username(username))
        .await?
        .filter(|agg| agg.page.is_published)
        .ok_or(ApiError::NotFound("page"))?;

    let mut sections = agg.sections;
    sections.retain_visible(&agg.settings);
    let days_together = agg
        .settings
        .show_counter
        .then(|| agg.settings.days_together(Utc::now().date_naive()))
        .flatten();

    Ok(Json(PublicPageResponse {
        username: agg.page.username,
        settings: agg.settings,
        sections,
        days_together,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub token: Option<String>,
}

pub const PREVIEW_COOKIE: &str = "valentine_preview";
const PREVIEW_PATH: &str = "/dashboard/preview";
const PREVIEW_LIFETIME_MINUTES: i64 = 10;

/// GET /dashboard/preview: the owner's page whatever its publish state.
///
/// Browsers navigating here cannot set headers, so a session token may come
/// as `?token=`. It is swapped for a short-lived preview token in an
/// HttpOnly cookie and the browser is sent back here without the query, so
/// the long-lived token does not stay in the address bar or history.
pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    cookies: Result<TypedHeader<Cookie>, TypedHeaderRejection>,
) -> ApiResult<Response> {
    if let Some(token) = &query.token {
        let Ok(claims) = verify_token(&state.jwt_secret, token) else {
            return Ok(Redirect::to("/login").into_response());
        };
        let short = issue_token(
            &state.jwt_secret,
            claims.sub,
            &claims.username,
            chrono::Duration::minutes(PREVIEW_LIFETIME_MINUTES),
        )?;
        let cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Strict",
            PREVIEW_COOKIE,
            short,
            PREVIEW_PATH,
            PREVIEW_LIFETIME_MINUTES * 60
        );
        return Ok(([(header::SET_COOKIE, cookie)], Redirect::to(PREVIEW_PATH)).into_response());
    }

    let token = match (&bearer, &cookies) {
        (Ok(TypedHeader(Authorization(b))), _) => Some(b.token().to_string()),
        (Err(_), Ok(TypedHeader(jar))) => jar.get(PREVIEW_COOKIE).map(str::to_string),
        (Err(_), Err(_)) => None,
    };
    let claims = match token.map(|t| verify_token(&state.jwt_secret, &t)) {
        Some(Ok(claims)) => claims,
        Some(Err(_)) => {
            warn!("Rejected preview with an invalid or expired token");
            return Ok(Redirect::to("/login").into_response());
        }
        None => return Ok(Redirect::to("/login").into_response()),
    };

    let Some(agg) = load_aggregate(&state, Lookup::Owner(claims.sub.to_string())).await? else {
        return not_found(claims.username);
    };

    let view = page_template(agg.page.username, agg.settings, agg.sections, true)?;
    Ok(render(view)?.into_response())
}

/// GET /login
pub async fn login_page() -> ApiResult<Html<String>> {
    render(LoginTemplate {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;
    use valentine_types::models::SectionItem;

    fn item(content: SectionContent, order_index: i64) -> SectionItem {
        SectionItem {
            id: Uuid::new_v4(),
            page_id: Uuid::nil(),
            order_index,
            content,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn poem(title: &str) -> SectionItem {
        item(
            SectionContent::Poem {
                title: title.into(),
                content: "roses\nviolets".into(),
            },
            0,
        )
    }

    fn photo(url: &str) -> SectionItem {
        item(
            SectionContent::Gallery {
                media_url: url.into(),
                caption: None,
                media_type: MediaType::Image,
            },
            0,
        )
    }

    #[test]
    fn deck_and_book_start_at_the_beginning() {
        let sections = PageSections::from_items(vec![
            photo("/media/1.jpg"),
            photo("/media/2.jpg"),
            photo("/media/3.jpg"),
            photo("/media/4.jpg"),
            poem("First"),
            poem("Second"),
        ]);
        let view = page_template("sam".into(), PageSettings::default(), sections, false).unwrap();

        let depths: Vec<usize> = view.gallery.iter().map(|c| c.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, STACK_DEPTH]);

        assert!(view.book_left.is_none());
        assert_eq!(view.book_right.as_ref().unwrap().title, "First");
        assert_eq!(view.poems[0].lines, vec!["roses", "violets"]);
    }

    #[test]
    fn hidden_sections_are_not_rendered() {
        let settings = PageSettings {
            show_poems: false,
            ..PageSettings::default()
        };
        let sections = PageSections::from_items(vec![poem("Hidden")]);
        let view = page_template("sam".into(), settings, sections, false).unwrap();
        assert!(view.poems.is_empty());
        assert!(view.book_right.is_none());
    }

    #[test]
    fn counter_and_config_are_embedded() {
        let settings = PageSettings {
            start_date: NaiveDate::from_ymd_opt(2020, 2, 14),
            show_counter: true,
            ..PageSettings::default()
        };
        let sections = PageSections::from_items(vec![photo("/media/</script>.jpg")]);
        let view = page_template("sam".into(), settings, sections, false).unwrap();

        assert!(view.days.unwrap().ends_with("days"));
        assert!(!view.config_json.contains("</script>"));

        let config: serde_json::Value = serde_json::from_str(&view.config_json).unwrap();
        assert_eq!(config["choreography"]["takeover_ms"], 3000);
        assert_eq!(config["burst"].as_array().unwrap().len(), BURST_SIZE);
        assert_eq!(config["burst_images"][0], "/media/</script>.jpg");
        assert_eq!(config["flip_ms"], 600);
    }

    #[test]
    fn accepting_brings_up_the_celebration_with_particles() {
        let clip = item(
            SectionContent::Gallery {
                media_url: "/media/clip.mp4".into(),
                caption: None,
                media_type: MediaType::Video,
            },
            0,
        );
        let view = page_template(
            "sam".into(),
            PageSettings::default(),
            PageSections::from_items(vec![clip]),
            false,
        )
        .unwrap();

        let config: serde_json::Value = serde_json::from_str(&view.config_json).unwrap();
        let idle = &config["choreography"]["stages"][0];
        assert_eq!(idle["stage"], "idle");
        assert_eq!(idle["on_accept"]["to"], "celebrated");
        let effects: Vec<&str> = idle["on_accept"]["effects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["effect"].as_str().unwrap())
            .collect();
        assert_eq!(effects, vec!["celebrate", "particles"]);

        let html = view.render().unwrap();
        assert!(html.contains(r#"id="celebration""#));
        assert!(html.contains("I knew you would say yes."));
        assert!(html.contains(r#"case "particles""#));
        assert!(html.contains("data-mute"));
    }

    #[test]
    fn templates_render() {
        let view = page_template("sam".into(), PageSettings::default(), PageSections::default(), true).unwrap();
        let html = view.render().unwrap();
        assert!(html.contains("Preview"));

        let html = ComingSoonTemplate {
            recipient_name: "Alex & Co".into(),
        }
        .render()
        .unwrap();
        assert!(html.contains("Alex &amp; Co"));

        assert!(NotFoundTemplate { username: "nobody".into() }.render().unwrap().contains("nobody"));
    }
}
