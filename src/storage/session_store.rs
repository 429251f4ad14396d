use std::path::Path;
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::storage::files::RecordDir;
use crate::storage::records::AttendanceSession;
use crate::storage::SessionRegistry;

pub struct SessionStore {
    records: RecordDir,
}

impl SessionStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            records: RecordDir::open(data_dir.join("sessions"))?,
        })
    }

    pub fn insert(&self, session: &AttendanceSession) -> Result<()> {
        if !self.records.insert_new(&session.id.to_string(), session)? {
            return Err(AttendanceError::Storage(format!("session id {} already used", session.id)));
        }
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<AttendanceSession>> {
        self.records.load(&id.to_string())
    }

    /// Sessions owned by one teacher, most recent first.
    pub fn list_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<AttendanceSession>> {
        let mut sessions: Vec<AttendanceSession> = self
            .records
            .load_all::<AttendanceSession>()?
            .into_iter()
            .filter(|s| s.teacher_id == teacher_id)
            .collect();
        sessions.sort_by(|a, b| {
            b.window.date.cmp(&a.window.date).then_with(|| b.window.start.cmp(&a.window.start))
        });
        Ok(sessions)
    }
}

impl SessionRegistry for SessionStore {
    fn find_session(&self, id: Uuid) -> Result<Option<AttendanceSession>> {
        self.get(id)
    }
}
