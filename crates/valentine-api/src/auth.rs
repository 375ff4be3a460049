use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use valentine_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use valentine_types::models::PageSettings;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::{AppState, with_db};

/// Sessions last a month.
const TOKEN_LIFETIME_DAYS: i64 = 30;

/// Usernames become a URL path segment: 3–32 chars of `[a-z0-9_-]`.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::BadRequest("username must be 3 to 32 characters".into()));
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
    {
        return Err(ApiError::BadRequest(
            "username may only contain lowercase letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let page_id = Uuid::new_v4();

    let name = username.clone();
    let created = with_db(&state, move |db| {
        if db.get_user_by_username(&name)?.is_some() {
            return Ok(false);
        }
        db.create_account(
            &user_id.to_string(),
            &name,
            &password_hash,
            &page_id.to_string(),
            &PageSettings::default(),
        )?;
        Ok(true)
    })
    .await?;

    if !created {
        return Err(ApiError::Conflict("username is already taken".into()));
    }

    let token = create_token(&state.jwt_secret, user_id, &username)?;
    info!("Registered {} with page {}", username, page_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            username,
            page_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for {}: {}", user.username, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    issue_token(secret, user_id, username, chrono::Duration::days(TOKEN_LIFETIME_DAYS))
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    lifetime: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + lifetime).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::verify_token;

    #[test]
    fn usernames_must_be_url_safe() {
        assert!(validate_username("sam_and-alex2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Sam").is_err());
        assert!(validate_username("sam/alex").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn tokens_verify_only_with_their_secret() {
        let user_id = Uuid::new_v4();
        let token = create_token("s3cret", user_id, "sam").unwrap();

        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "sam");

        assert!(matches!(verify_token("other", &token), Err(ApiError::Unauthorized)));
        assert!(matches!(verify_token("s3cret", "not-a-jwt"), Err(ApiError::Unauthorized)));
    }
}
