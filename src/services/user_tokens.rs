// src/services/user_tokens.rs
//! Encrypted OAuth token storage, one row per user

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use super::encryption::{EncryptionError, TokenCipher};
use crate::common::helpers::now_rfc3339;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct UserTokenStore {
    db: SqlitePool,
    cipher: Arc<TokenCipher>,
}

impl UserTokenStore {
    pub fn new(db: SqlitePool, cipher: Arc<TokenCipher>) -> Self {
        Self { db, cipher }
    }

    /// Encrypts and upserts the token set for `user_id`
    pub async fn save(&self, user_id: &str, tokens: &StoredTokens) -> Result<(), TokenStoreError> {
        let json = serde_json::to_vec(tokens)?;
        let encrypted = self.cipher.encrypt(&json)?;

        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, encrypted_tokens, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                encrypted_tokens = excluded.encrypted_tokens,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(encrypted)
        .bind(now_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Returns `None` when nothing is stored or the blob can't be decrypted
    pub async fn load(&self, user_id: &str) -> Result<Option<StoredTokens>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT encrypted_tokens FROM user_tokens WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let Some((encrypted,)) = row else {
            return Ok(None);
        };

        let decrypted = match self.cipher.decrypt(&encrypted) {
            Ok(plain) => plain,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Stored tokens could not be decrypted");
                return Ok(None);
            }
        };

        match serde_json::from_slice(&decrypted) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Stored tokens are not valid JSON");
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_support::{insert_user, test_pool};

    fn tokens() -> StoredTokens {
        StoredTokens {
            access_token: "ya29.access".into(),
            refresh_token: Some("1//refresh".into()),
            expires_at: Some(1_900_000_000),
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let pool = test_pool().await;
        insert_user(&pool, "U_TOKEN01", "a@example.com", "A").await;
        let cipher = Arc::new(TokenCipher::new(&TokenCipher::generate_secret(), None).unwrap());
        let store = UserTokenStore::new(pool.clone(), cipher);

        store.save("U_TOKEN01", &tokens()).await.unwrap();

        let (raw,): (String,) =
            sqlx::query_as("SELECT encrypted_tokens FROM user_tokens WHERE user_id = ?")
                .bind("U_TOKEN01")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(!raw.contains("ya29.access"));

        assert_eq!(store.load("U_TOKEN01").await.unwrap(), Some(tokens()));

        store.delete("U_TOKEN01").await.unwrap();
        assert_eq!(store.load("U_TOKEN01").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecryptable_tokens_load_as_none() {
        let pool = test_pool().await;
        insert_user(&pool, "U_TOKEN02", "b@example.com", "B").await;

        let old = Arc::new(TokenCipher::new(&TokenCipher::generate_secret(), None).unwrap());
        UserTokenStore::new(pool.clone(), old)
            .save("U_TOKEN02", &tokens())
            .await
            .unwrap();

        let rotated_away =
            Arc::new(TokenCipher::new(&TokenCipher::generate_secret(), None).unwrap());
        let store = UserTokenStore::new(pool, rotated_away);
        assert_eq!(store.load("U_TOKEN02").await.unwrap(), None);
    }
}
