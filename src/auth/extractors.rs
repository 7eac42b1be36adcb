//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};

use super::models::User;
use crate::common::{ApiError, SharedState};
use crate::session::Session;

/// Authenticated user extractor
///
/// Reads the user id from the session and loads the user row. A session
/// pointing at a deleted user is treated as signed out.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<SharedState> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let session = Session::from_request_parts(parts, state).await?;

        let user_id = match session.user_id().await {
            Some(id) => id,
            None => {
                debug!("Authentication failed: no user in session");
                return Err(ApiError::Unauthorized("Authentication required".into()));
            }
        };

        let app_state = state_lock.read().await.clone();

        match app_state.auth_service.find_user(&user_id).await {
            Ok(Some(user)) => Ok(AuthedUser {
                id: user.id.clone(),
                email: user.email.clone(),
                user,
            }),
            Ok(None) => {
                warn!(user_id = %user_id, "Session refers to a missing user");
                session.destroy().await;
                Err(ApiError::Unauthorized("Authentication required".into()))
            }
            Err(e) => Err(ApiError::DatabaseError(e)),
        }
    }
}
