//! Authentication handlers

use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{CallbackQuery, MeResponse};
use super::service::AuthError;
use crate::common::{
    helpers::wants_json,
    i18n::{translate, DEFAULT_LOCALE},
    ApiError, SharedState,
};
use crate::services::audit::RequestMeta;
use crate::session::Session;

/// GET /auth/login - Start the Google OAuth flow
pub async fn login(
    Extension(state_lock): Extension<SharedState>,
    session: Session,
    meta: RequestMeta,
) -> Redirect {
    let state = state_lock.read().await.clone();
    let auth_url = state.auth_service.initiate_login(&session, &meta).await;
    info!("Redirecting to Google OAuth");
    Redirect::to(&auth_url)
}

/// GET /auth/callback - Finish the OAuth flow
pub async fn callback(
    Extension(state_lock): Extension<SharedState>,
    session: Session,
    meta: RequestMeta,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    let state = state_lock.read().await.clone();
    let locale = session.locale().await.unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    if let Some(error) = params.error.as_deref() {
        warn!(oauth_error = %error, "Google OAuth returned error");
        session.set_flash(translate(&locale, "auth.login_failed")).await;
        return Redirect::to("/");
    }

    let (Some(code), Some(oauth_state)) = (params.code.as_deref(), params.state.as_deref()) else {
        warn!("OAuth callback missing code or state");
        session.set_flash(translate(&locale, "auth.login_failed")).await;
        return Redirect::to("/");
    };

    match state
        .auth_service
        .handle_callback(&session, code, oauth_state, &meta)
        .await
    {
        Ok(_) => Redirect::to("/dashboard"),
        Err(e) => {
            warn!(error = %e, "Login failed");
            let key = match e {
                AuthError::NotAuthorized => "auth.not_authorized",
                _ => "auth.login_failed",
            };
            session.set_flash(translate(&locale, key)).await;
            Redirect::to("/")
        }
    }
}

/// POST /auth/logout
pub async fn logout(
    Extension(state_lock): Extension<SharedState>,
    authed: AuthedUser,
    session: Session,
    meta: RequestMeta,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    state.auth_service.logout(&session, &authed.id, &meta).await?;

    if wants_json(&headers) {
        Ok(Json(json!({ "success": true, "redirect": "/" })).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

/// DELETE /auth/account
pub async fn delete_account(
    Extension(state_lock): Extension<SharedState>,
    authed: AuthedUser,
    session: Session,
    meta: RequestMeta,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();
    state
        .auth_service
        .delete_account(&session, &authed.id, &meta)
        .await?;

    Ok(Json(json!({ "success": true, "redirect": "/" })))
}

/// GET /auth/me - Current user and CSRF token
pub async fn me(authed: AuthedUser, session: Session) -> Json<MeResponse> {
    Json(MeResponse {
        user: authed.user,
        csrf_token: session.csrf_token().await,
    })
}
