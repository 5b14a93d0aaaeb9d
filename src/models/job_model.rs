use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    ReleaseSeats { booking_id: ObjectId },
    SendConfirmation { booking_id: ObjectId },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub payload: JobPayload,
    pub run_at: DateTime,
    #[serde(default)]
    pub locked_until: Option<DateTime>,
    #[serde(default)]
    pub attempts: i32,
    #[serde(default)]
    pub dead: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(payload: JobPayload, run_at: DateTime) -> Self {
        Job {
            id: None,
            payload,
            run_at,
            locked_until: None,
            attempts: 0,
            dead: false,
            last_error: None,
        }
    }
}
