use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use uuid::Uuid;
use crate::accounts::{NewTeacher, TeacherProfile};
use crate::common::{AttendanceError, Result};
use crate::core::roster::StudentForm;
use crate::storage::{AttendanceSession, Student};

// Request types
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Request {
    RegisterTeacher(NewTeacher),
    Login { email: String, password: String },
    Profile { token: String },
    UpdateTeacher { token: String, first_name: Option<String>, last_name: Option<String> },

    CreateSession { token: String, date: String, start: String, end: String },
    ListSessions { token: String },
    SessionDetail { session_id: Uuid },

    RegisterStudent { token: String, form: StudentForm },
    UpdateStudent { token: String, student_id: Uuid, form: StudentForm },
    ListStudents { token: String },
    GetStudent { token: String, student_id: Uuid },

    PhotoForm { session_id: Uuid, student_id: Uuid },
    CheckIn(CheckinSubmission),
    AttendanceSheet { token: String, session_id: Uuid },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckinSubmission {
    pub session_id: Uuid,
    pub student_id: Uuid,
    /// Base64 JPEG or PNG, optionally with a data-URI prefix.
    pub photo: String,
}

// Response types
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Response {
    Teacher { profile: TeacherProfile, token: Option<String> },
    Session(SessionView),
    Sessions(Vec<SessionView>),
    Student(StudentView),
    Students(Vec<StudentView>),
    PhotoForm(PhotoFormView),
    CheckedIn(CheckinReceipt),
    Attendance(AttendanceSheet),
    /// The request was refused; `code` is a stable discriminator.
    Rejected { code: String, message: String },
    Error(String),
}

impl Response {
    pub fn from_error(err: &AttendanceError) -> Self {
        if err.is_internal() {
            Response::Error(err.to_string())
        } else {
            Response::Rejected {
                code: err.code().to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionView {
    pub id: Uuid,
    pub date: String,
    pub start: String,
    pub end: String,
    pub teacher_id: Uuid,
    pub active: bool,
}

impl SessionView {
    pub fn new(session: &AttendanceSession, now: NaiveDateTime) -> Self {
        Self {
            id: session.id,
            date: session.window.date_string(),
            start: session.window.start_string(),
            end: session.window.end_string(),
            teacher_id: session.teacher_id,
            active: session.window.activity(now).is_active(),
        }
    }
}

/// Student without the photo payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StudentView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub registration: String,
    pub has_reference_photo: bool,
}

impl From<&Student> for StudentView {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            registration: student.registration.clone(),
            has_reference_photo: student.has_reference_photo(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoFormView {
    pub session: SessionView,
    pub student_id: Uuid,
    pub student_name: String,
    pub has_reference_photo: bool,
    /// Whether a capture can be submitted right now.
    pub active: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckinReceipt {
    pub attendance_id: Uuid,
    pub similarity: f64,
    pub recorded_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttendanceEntry {
    pub attendance_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub registration: Option<String>,
    pub recorded_at: NaiveDateTime,
    pub similarity_percent: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttendanceSheet {
    pub session: SessionView,
    pub entries: Vec<AttendanceEntry>,
}

/// Writes one `u32` little-endian length prefix followed by the bincode body.
pub fn write_message<T: Serialize, W: Write>(writer: &mut W, message: &T) -> Result<()> {
    let data = bincode::serialize(message)
        .map_err(|e| AttendanceError::Other(anyhow::anyhow!("Failed to serialize message: {}", e)))?;
    let len = u32::try_from(data.len())
        .map_err(|_| AttendanceError::InvalidInput(format!("Message too large: {} bytes", data.len())))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message, refusing bodies larger than `max_len`.
pub fn read_message<T: for<'de> Deserialize<'de>, R: Read>(reader: &mut R, max_len: usize) -> Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > max_len {
        return Err(AttendanceError::InvalidInput(format!(
            "Message too large: {} bytes (limit {})", len, max_len
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    bincode::deserialize(&buf)
        .map_err(|e| AttendanceError::Other(anyhow::anyhow!("Failed to deserialize message: {}", e)))
}
