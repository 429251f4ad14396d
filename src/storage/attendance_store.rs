use std::path::{Path, PathBuf};
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::storage::files::RecordDir;
use crate::storage::records::AttendanceRecord;
use crate::storage::AttendanceLedger;

/// Attendance records laid out as `attendance/<session>/<student>.bincode`.
///
/// The file name is the uniqueness key: a second record for the same pair
/// cannot be linked into place.
pub struct AttendanceStore {
    root: PathBuf,
}

impl AttendanceStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join("attendance");
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn session_dir(&self, session_id: Uuid) -> Result<RecordDir> {
        RecordDir::open(self.root.join(session_id.to_string()))
    }

    /// Records of one session, oldest first.
    pub fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        if !self.root.join(session_id.to_string()).exists() {
            return Ok(Vec::new());
        }
        let mut records: Vec<AttendanceRecord> = self.session_dir(session_id)?.load_all()?;
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }
}

impl AttendanceLedger for AttendanceStore {
    fn exists(&self, student_id: Uuid, session_id: Uuid) -> Result<bool> {
        let path = self.root.join(session_id.to_string());
        if !path.exists() {
            return Ok(false);
        }
        Ok(self.session_dir(session_id)?.contains(&student_id.to_string()))
    }

    fn insert(&self, record: &AttendanceRecord) -> Result<()> {
        let dir = self.session_dir(record.session_id)?;
        if !dir.insert_new(&record.student_id.to_string(), record)? {
            return Err(AttendanceError::UniqueViolation(format!(
                "attendance ({}, {})", record.student_id, record.session_id
            )));
        }
        tracing::debug!("Stored attendance {} in {:?}", record.id, dir.root());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::STORAGE_VERSION;
    use chrono::NaiveDateTime;
    use std::sync::Arc;

    fn record(student_id: Uuid, session_id: Uuid) -> AttendanceRecord {
        AttendanceRecord {
            version: STORAGE_VERSION,
            id: Uuid::new_v4(),
            recorded_at: NaiveDateTime::parse_from_str("2025-09-13 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            candidate_photo: "photo".into(),
            similarity: 0.9,
            student_id,
            session_id,
        }
    }

    #[test]
    fn second_insert_for_pair_is_a_unique_violation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AttendanceStore::open(tmp.path()).unwrap();
        let (student, session) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(!store.exists(student, session).unwrap());
        store.insert(&record(student, session)).unwrap();
        assert!(store.exists(student, session).unwrap());

        let err = store.insert(&record(student, session)).unwrap_err();
        assert!(matches!(err, AttendanceError::UniqueViolation(_)));
        assert_eq!(store.list_for_session(session).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_inserts_store_exactly_one() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttendanceStore::open(tmp.path()).unwrap());
        let (student, session) = (Uuid::new_v4(), Uuid::new_v4());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert(&record(student, session)).is_ok())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(store.list_for_session(session).unwrap().len(), 1);
    }

    #[test]
    fn unknown_session_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AttendanceStore::open(tmp.path()).unwrap();
        assert!(store.list_for_session(Uuid::new_v4()).unwrap().is_empty());
    }
}
