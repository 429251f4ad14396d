use std::path::Path;
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::storage::files::{index_key, RecordDir};
use crate::storage::records::Teacher;

pub struct TeacherStore {
    records: RecordDir,
    emails: RecordDir,
}

impl TeacherStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            records: RecordDir::open(data_dir.join("teachers"))?,
            emails: RecordDir::open(data_dir.join("teacher_emails"))?,
        })
    }

    pub fn insert(&self, teacher: &Teacher) -> Result<()> {
        if !self.emails.insert_new(&index_key(&teacher.email), &teacher.id)? {
            return Err(AttendanceError::Conflict("email is already registered".into()));
        }

        if !self.records.insert_new(&teacher.id.to_string(), teacher)? {
            self.emails.remove(&index_key(&teacher.email))?;
            return Err(AttendanceError::Storage(format!("teacher id {} already used", teacher.id)));
        }

        Ok(())
    }

    /// Replaces profile fields. The email is the login key and never changes here.
    pub fn save(&self, teacher: &Teacher) -> Result<()> {
        self.records.save(&teacher.id.to_string(), teacher)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Teacher>> {
        self.records.load(&id.to_string())
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        match self.emails.load::<Uuid>(&index_key(email))? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }
}
