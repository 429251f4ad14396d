use chrono::NaiveDateTime;
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::core::session_window::can_check_in;
use crate::core::validation::{run_chain, ChainContext, CheckinRequest};
use crate::storage::{AttendanceLedger, AttendanceRecord, SessionRegistry, SubjectRegistry, STORAGE_VERSION};

/// Registers attendance: session gate, validation chain, then a single insert.
pub struct CheckinDesk<'a> {
    pub subjects: &'a dyn SubjectRegistry,
    pub sessions: &'a dyn SessionRegistry,
    pub attendance: &'a dyn AttendanceLedger,
    pub similarity_threshold: f64,
}

impl<'a> CheckinDesk<'a> {
    pub fn check_in(&self, mut request: CheckinRequest, now: NaiveDateTime) -> Result<AttendanceRecord> {
        let session = self
            .sessions
            .find_session(request.session_id)?
            .ok_or(AttendanceError::SessionNotFound(request.session_id))?;

        if !can_check_in(&session.window, now) {
            return Err(AttendanceError::SessionInactive);
        }

        let ctx = ChainContext {
            subjects: self.subjects,
            attendance: self.attendance,
            similarity_threshold: self.similarity_threshold,
        };
        let similarity = run_chain(&mut request, &ctx)?;

        let record = AttendanceRecord {
            version: STORAGE_VERSION,
            id: Uuid::new_v4(),
            recorded_at: now,
            candidate_photo: request.candidate_photo,
            similarity,
            student_id: request.student_id,
            session_id: request.session_id,
        };

        // The store's uniqueness is what settles two racing check-ins
        match self.attendance.insert(&record) {
            Ok(()) => {}
            Err(AttendanceError::UniqueViolation(_)) => {
                return Err(AttendanceError::DuplicateCheckin {
                    student_id: record.student_id,
                    session_id: record.session_id,
                });
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            "Attendance {} recorded for student {} in session {} (similarity {:.1}%)",
            record.id, record.student_id, record.session_id, similarity * 100.0
        );
        Ok(record)
    }
}
