use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::session_window::SessionWindow;

pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub version: u32,
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Enrollment code, unique across the roster.
    pub registration: String,
    /// Base64 photo; empty when none was registered.
    #[serde(default)]
    pub reference_photo: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_reference_photo(&self) -> bool {
        !self.reference_photo.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub version: u32,
    pub id: Uuid,
    pub window: SessionWindow,
    pub teacher_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub version: u32,
    pub id: Uuid,
    pub recorded_at: NaiveDateTime,
    pub candidate_photo: String,
    pub similarity: f64,
    pub student_id: Uuid,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub version: u32,
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
