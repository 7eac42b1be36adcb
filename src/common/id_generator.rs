// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXX (e.g., T_K7NP3XQ2 for tasks)
//!
//! The alphabet excludes I, L, O and U, so IDs can be read aloud and typed
//! back without ambiguity.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Number of random characters after the prefix (32^8 combinations per entity)
const ID_LENGTH: usize = 8;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Calendar event (E_)
    Event,
    /// Task (T_)
    Task,
    /// Schedule request (R_)
    ScheduleRequest,
    /// Proposed slot of a schedule request (S_)
    ScheduleSlot,
    /// Push subscription (P_)
    Subscription,
    /// Stored notification (N_)
    Notification,
    /// Audit log entry (H_) - H for History
    Audit,
    /// Date night category (C_)
    DateCategory,
    /// Date night idea (D_)
    DateIdea,
    /// Completed date (X_)
    CompletedDate,
    /// Shopping list item (G_) - G for Groceries
    ShoppingItem,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Event => "E",
            EntityPrefix::Task => "T",
            EntityPrefix::ScheduleRequest => "R",
            EntityPrefix::ScheduleSlot => "S",
            EntityPrefix::Subscription => "P",
            EntityPrefix::Notification => "N",
            EntityPrefix::Audit => "H",
            EntityPrefix::DateCategory => "C",
            EntityPrefix::DateIdea => "D",
            EntityPrefix::CompletedDate => "X",
            EntityPrefix::ShoppingItem => "G",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Example
/// ```ignore
/// let task_id = generate_id(EntityPrefix::Task);
/// // Returns something like "T_K7NP3XQ2"
/// ```
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(ID_LENGTH))
}

// ============================================================================
// Convenience functions for each entity type
// ============================================================================

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_event_id() -> String {
    generate_id(EntityPrefix::Event)
}

pub fn generate_task_id() -> String {
    generate_id(EntityPrefix::Task)
}

pub fn generate_schedule_request_id() -> String {
    generate_id(EntityPrefix::ScheduleRequest)
}

pub fn generate_schedule_slot_id() -> String {
    generate_id(EntityPrefix::ScheduleSlot)
}

pub fn generate_subscription_id() -> String {
    generate_id(EntityPrefix::Subscription)
}

pub fn generate_notification_id() -> String {
    generate_id(EntityPrefix::Notification)
}

pub fn generate_audit_id() -> String {
    generate_id(EntityPrefix::Audit)
}

pub fn generate_date_category_id() -> String {
    generate_id(EntityPrefix::DateCategory)
}

pub fn generate_date_idea_id() -> String {
    generate_id(EntityPrefix::DateIdea)
}

pub fn generate_completed_date_id() -> String {
    generate_id(EntityPrefix::CompletedDate)
}

pub fn generate_shopping_item_id() -> String {
    generate_id(EntityPrefix::ShoppingItem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let task_id = generate_task_id();
        assert!(task_id.starts_with("T_"));
        assert_eq!(task_id.len(), 2 + ID_LENGTH);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_event_id();
        let random_part = &id[2..];

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_shopping_item_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }

    #[test]
    fn test_all_prefixes() {
        assert!(generate_user_id().starts_with("U_"));
        assert!(generate_event_id().starts_with("E_"));
        assert!(generate_task_id().starts_with("T_"));
        assert!(generate_schedule_request_id().starts_with("R_"));
        assert!(generate_schedule_slot_id().starts_with("S_"));
        assert!(generate_subscription_id().starts_with("P_"));
        assert!(generate_notification_id().starts_with("N_"));
        assert!(generate_audit_id().starts_with("H_"));
        assert!(generate_date_category_id().starts_with("C_"));
        assert!(generate_date_idea_id().starts_with("D_"));
        assert!(generate_completed_date_id().starts_with("X_"));
        assert!(generate_shopping_item_id().starts_with("G_"));
    }
}
