// src/session/middleware.rs

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use tracing::{debug, warn};

use super::handle::{Session, SessionOutcome};
use crate::common::{dev_mode::DevModeConfig, SharedState};

fn session_cookie(dev_mode: &DevModeConfig, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build((dev_mode.session_cookie_name(), value))
        .path("/")
        .http_only(true)
        .secure(dev_mode.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

/// Loads the session named by the cookie (or starts a fresh one), exposes it
/// to the rest of the stack and writes it back afterwards.
pub async fn session_middleware(
    Extension(state_lock): Extension<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let state = state_lock.read().await.clone();
    let cookie_name = state.dev_mode.session_cookie_name();
    let now = Utc::now().timestamp();

    let loaded = match jar.get(cookie_name) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            match state.sessions.load(&id, now).await {
                Ok(Some(data)) => Some((id, data)),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "Failed to load session, starting a new one");
                    None
                }
            }
        }
        None => None,
    };

    let session = match loaded {
        Some((id, data)) => Session::existing(id, data),
        None => Session::fresh(),
    };

    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    let jar = match session.finish().await {
        SessionOutcome::Unchanged => jar,
        SessionOutcome::Persist {
            id,
            data,
            replaced_id,
        } => {
            if let Some(old_id) = replaced_id {
                debug!("Rotating session id");
                if let Err(e) = state.sessions.delete(&old_id).await {
                    warn!(error = %e, "Failed to delete rotated session");
                }
            }
            match state.sessions.save(&id, &data, now).await {
                Ok(()) => jar.add(session_cookie(
                    &state.dev_mode,
                    id,
                    state.config.session_lifetime_seconds,
                )),
                Err(e) => {
                    warn!(error = %e, "Failed to persist session");
                    jar
                }
            }
        }
        SessionOutcome::Destroy { id } => {
            if let Some(id) = id {
                if let Err(e) = state.sessions.delete(&id).await {
                    warn!(error = %e, "Failed to delete destroyed session");
                }
            }
            jar.remove(session_cookie(&state.dev_mode, String::new(), 0))
        }
    };

    (jar, response).into_response()
}
