use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, instrument, warn};

use crate::auth::dto::{AuthRequest, AuthResponse};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::auth::session::SessionKeys;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/auth — login, or implicit registration for an unseen username.
#[instrument(skip(state, payload))]
pub async fn auth(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (Some(username), Some(password)) = (payload.username, payload.password) else {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    };

    match User::find(&state.db, &username).await? {
        Some(user) => {
            if !verify_password(&password, &user.password_hash)? {
                warn!(%username, "invalid password");
                return Err(ApiError::InvalidPassword);
            }
            info!(%username, "logged in");
        }
        None => {
            let hash = hash_password(&password)?;
            User::create(&state.db, &username, &hash)
                .await
                .map_err(|e| match e {
                    // lost a registration race to a concurrent first login
                    sqlx::Error::Database(ref db_err)
                        if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
                    {
                        warn!(%username, "concurrent registration conflict");
                        ApiError::UsernameTaken
                    }
                    other => ApiError::Database(other),
                })?;
            info!(%username, "registered");
        }
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&username)?;
    let cookie = keys.cookie(token).to_string();

    let mut response = Json(AuthResponse { success: true }).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("session cookie encoding: {e}")))?,
    );
    Ok(response)
}
