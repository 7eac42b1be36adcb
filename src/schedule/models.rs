use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MAX_SLOTS: usize = 5;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_DECLINED: &str = "declined";

/// A request joined with both parties' names.
/// `status` is one of pending | accepted | declined | cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleRequest {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: Option<String>,
    pub status: String,
    pub selected_slot_id: Option<String>,
    pub response_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleSlot {
    pub id: String,
    pub request_id: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequestWithSlots {
    #[serde(flatten)]
    pub request: ScheduleRequest,
    pub slots: Vec<ScheduleSlot>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleOverview {
    pub incoming: Vec<ScheduleRequestWithSlots>,
    pub outgoing: Vec<ScheduleRequestWithSlots>,
}

/// Someone a request can be sent to
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserOption {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub start_time: String,
    pub end_time: String,
}

/// Body of `POST /schedule/send`
#[derive(Debug, Clone, Deserialize)]
pub struct SendScheduleRequest {
    pub recipient_id: String,
    pub title: String,
    pub message: Option<String>,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptRequest {
    pub slot_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclineRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub request: ScheduleRequestWithSlots,
    pub email_sent: bool,
}
