use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    #[error("Not a valid image: {0}")]
    InvalidImage(String),

    #[error("Unsupported image format: {0} (only JPEG and PNG)")]
    UnsupportedFormat(String),

    #[error("Invalid {0} identifier")]
    InvalidIdentifier(&'static str),

    #[error("Student not found: {0}")]
    SubjectNotFound(Uuid),

    #[error("Student {0} has no reference photo registered")]
    MissingReferencePhoto(Uuid),

    #[error("Face does not match (similarity: {:.2}% < {:.2}% required)", .score * 100.0, .threshold * 100.0)]
    SimilarityBelowThreshold { score: f64, threshold: f64 },

    #[error("Attendance already recorded for student {student_id} in session {session_id}")]
    DuplicateCheckin { student_id: Uuid, session_id: Uuid },

    #[error("Attendance session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Attendance can only be registered while the session is active")]
    SessionInactive,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl AttendanceError {
    /// Stable discriminator surfaced to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::InvalidImage(_) => "invalid_image",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::SubjectNotFound(_) => "subject_not_found",
            Self::MissingReferencePhoto(_) => "missing_reference_photo",
            Self::SimilarityBelowThreshold { .. } => "similarity_below_threshold",
            Self::DuplicateCheckin { .. } => "duplicate_checkin",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionInactive => "session_inactive",
            Self::UniqueViolation(_) => "unique_violation",
            Self::InvalidInput(_) => "invalid_input",
            Self::Conflict(_) => "conflict",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Image(_) => "image",
            Self::Other(_) => "other",
        }
    }

    /// Internal faults, as opposed to rejections caused by the request itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Config(_) | Self::Io(_) | Self::Image(_) | Self::Other(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
