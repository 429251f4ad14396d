pub mod attendance_store;
pub mod files;
pub mod records;
pub mod session_store;
pub mod student_store;
pub mod teacher_store;

pub use attendance_store::AttendanceStore;
pub use records::{AttendanceRecord, AttendanceSession, Student, Teacher, STORAGE_VERSION};
pub use session_store::SessionStore;
pub use student_store::StudentStore;
pub use teacher_store::TeacherStore;

use std::path::{Path, PathBuf};
use uuid::Uuid;
use crate::common::Result;

/// Lookup of students by id, as needed by the check-in chain.
pub trait SubjectRegistry {
    fn find_subject(&self, id: Uuid) -> Result<Option<Student>>;
}

pub trait SessionRegistry {
    fn find_session(&self, id: Uuid) -> Result<Option<AttendanceSession>>;
}

/// Attendance persistence. `insert` must fail with
/// `AttendanceError::UniqueViolation` when the (student, session) pair is
/// already recorded, even when two inserts race.
pub trait AttendanceLedger {
    fn exists(&self, student_id: Uuid, session_id: Uuid) -> Result<bool>;
    fn insert(&self, record: &AttendanceRecord) -> Result<()>;
}

/// All record stores rooted under one data directory.
pub struct Storage {
    data_dir: PathBuf,
    pub teachers: TeacherStore,
    pub students: StudentStore,
    pub sessions: SessionStore,
    pub attendance: AttendanceStore,
}

impl Storage {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        tracing::debug!("Opening record stores under {:?}", data_dir);

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            teachers: TeacherStore::open(data_dir)?,
            students: StudentStore::open(data_dir)?,
            sessions: SessionStore::open(data_dir)?,
            attendance: AttendanceStore::open(data_dir)?,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
