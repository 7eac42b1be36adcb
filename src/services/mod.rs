// src/services/mod.rs
//
// Shared services used across the feature modules

pub mod audit;
pub mod email;
pub mod encryption;
pub mod rate_limit;
pub mod user_tokens;

// Re-export commonly used types for convenience
pub use audit::{AuditLog, RequestMeta};
pub use email::EmailService;
pub use encryption::{EncryptionError, TokenCipher};
pub use rate_limit::RateLimitService;
pub use user_tokens::UserTokenStore;
