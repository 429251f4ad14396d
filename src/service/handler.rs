use chrono::{Local, NaiveDateTime};
use std::path::Path;
use uuid::Uuid;
use crate::accounts::{TeacherAccounts, TokenClaims, TokenSigner};
use crate::common::{AttendanceError, Config, Result};
use crate::core::checkin::CheckinDesk;
use crate::core::roster::{self, StudentForm};
use crate::core::session_window::{can_view_reference_face, SessionWindow};
use crate::core::validation::CheckinRequest;
use crate::service::protocol::{
    AttendanceEntry, AttendanceSheet, CheckinReceipt, CheckinSubmission, PhotoFormView, Request,
    Response, SessionView, StudentView,
};
use crate::storage::{AttendanceSession, Storage, STORAGE_VERSION};

pub const UNKNOWN_STUDENT: &str = "Unknown student";

/// Everything a request needs. Shared read-only between connection threads.
pub struct AppState {
    config: Config,
    storage: Storage,
    accounts: TeacherAccounts,
}

impl AppState {
    pub fn new(config: Config, storage: Storage, accounts: TeacherAccounts) -> Self {
        Self { config, storage, accounts }
    }

    pub fn open(config: Config, data_dir: &Path, dev_mode: bool) -> Result<Self> {
        let storage = Storage::open(data_dir)?;
        let signer = TokenSigner::from_config(&config.auth, dev_mode)?;
        let accounts = TeacherAccounts::new(signer, config.auth.password_iterations);
        Ok(Self::new(config, storage, accounts))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn handle(&self, request: Request) -> Response {
        self.handle_at(request, Local::now().naive_local())
    }

    /// Answers one request as of `now`. Failures become `Rejected` or `Error`.
    pub fn handle_at(&self, request: Request, now: NaiveDateTime) -> Response {
        match self.dispatch(request, now) {
            Ok(response) => response,
            Err(e) => {
                if e.is_internal() {
                    tracing::error!("Request failed: {}", e);
                } else {
                    tracing::info!("Request rejected ({}): {}", e.code(), e);
                }
                Response::from_error(&e)
            }
        }
    }

    fn dispatch(&self, request: Request, now: NaiveDateTime) -> Result<Response> {
        let teachers = &self.storage.teachers;

        Ok(match request {
            Request::RegisterTeacher(form) => {
                let (profile, token) = self.accounts.register(teachers, &form)?;
                Response::Teacher { profile, token: Some(token) }
            }
            Request::Login { email, password } => {
                let (profile, token) = self.accounts.login(teachers, &email, &password)?;
                Response::Teacher { profile, token: Some(token) }
            }
            Request::Profile { token } => Response::Teacher {
                profile: self.accounts.profile(teachers, &token)?,
                token: None,
            },
            Request::UpdateTeacher { token, first_name, last_name } => Response::Teacher {
                profile: self.accounts.update(
                    teachers,
                    &token,
                    first_name.as_deref(),
                    last_name.as_deref(),
                )?,
                token: None,
            },
            Request::CreateSession { token, date, start, end } => {
                Response::Session(self.create_session(&token, &date, &start, &end, now)?)
            }
            Request::ListSessions { token } => Response::Sessions(self.list_sessions(&token, now)?),
            Request::SessionDetail { session_id } => {
                Response::Session(self.session_detail(session_id, now)?)
            }
            Request::RegisterStudent { token, form } => {
                Response::Student(self.register_student(&token, &form)?)
            }
            Request::UpdateStudent { token, student_id, form } => {
                Response::Student(self.update_student(&token, student_id, &form)?)
            }
            Request::ListStudents { token } => Response::Students(self.list_students(&token)?),
            Request::GetStudent { token, student_id } => {
                Response::Student(self.get_student(&token, student_id)?)
            }
            Request::PhotoForm { session_id, student_id } => {
                Response::PhotoForm(self.photo_form(session_id, student_id, now)?)
            }
            Request::CheckIn(submission) => Response::CheckedIn(self.check_in(submission, now)?),
            Request::AttendanceSheet { token, session_id } => {
                Response::Attendance(self.attendance_sheet(&token, session_id, now)?)
            }
        })
    }

    fn teacher(&self, token: &str) -> Result<TokenClaims> {
        self.accounts.authenticate(token)
    }

    pub fn create_session(
        &self,
        token: &str,
        date: &str,
        start: &str,
        end: &str,
        now: NaiveDateTime,
    ) -> Result<SessionView> {
        let claims = self.teacher(token)?;
        let session = AttendanceSession {
            version: STORAGE_VERSION,
            id: Uuid::new_v4(),
            window: SessionWindow::parse(date, start, end)?,
            teacher_id: claims.sub,
        };
        self.storage.sessions.insert(&session)?;
        tracing::info!(
            "Teacher {} created session {} on {} {}-{}",
            claims.sub, session.id, session.window.date_string(),
            session.window.start_string(), session.window.end_string()
        );
        Ok(SessionView::new(&session, now))
    }

    pub fn list_sessions(&self, token: &str, now: NaiveDateTime) -> Result<Vec<SessionView>> {
        let claims = self.teacher(token)?;
        Ok(self
            .storage
            .sessions
            .list_for_teacher(claims.sub)?
            .iter()
            .map(|s| SessionView::new(s, now))
            .collect())
    }

    pub fn session_detail(&self, session_id: Uuid, now: NaiveDateTime) -> Result<SessionView> {
        let session = self
            .storage
            .sessions
            .get(session_id)?
            .ok_or(AttendanceError::SessionNotFound(session_id))?;
        Ok(SessionView::new(&session, now))
    }

    pub fn register_student(&self, token: &str, form: &StudentForm) -> Result<StudentView> {
        self.teacher(token)?;
        let student = roster::register_student(&self.storage.students, form)?;
        Ok(StudentView::from(&student))
    }

    pub fn update_student(&self, token: &str, student_id: Uuid, form: &StudentForm) -> Result<StudentView> {
        self.teacher(token)?;
        let student = roster::update_student(&self.storage.students, student_id, form)?;
        Ok(StudentView::from(&student))
    }

    pub fn list_students(&self, token: &str) -> Result<Vec<StudentView>> {
        self.teacher(token)?;
        Ok(self.storage.students.list()?.iter().map(StudentView::from).collect())
    }

    pub fn get_student(&self, token: &str, student_id: Uuid) -> Result<StudentView> {
        self.teacher(token)?;
        let student = self
            .storage
            .students
            .get(student_id)?
            .ok_or(AttendanceError::SubjectNotFound(student_id))?;
        Ok(StudentView::from(&student))
    }

    pub fn check_in(&self, submission: CheckinSubmission, now: NaiveDateTime) -> Result<CheckinReceipt> {
        let desk = CheckinDesk {
            subjects: &self.storage.students,
            sessions: &self.storage.sessions,
            attendance: &self.storage.attendance,
            similarity_threshold: self.config.checkin.similarity_threshold,
        };
        let request = CheckinRequest::new(submission.photo, submission.session_id, submission.student_id);
        let record = desk.check_in(request, now)?;

        Ok(CheckinReceipt {
            attendance_id: record.id,
            similarity: record.similarity,
            recorded_at: record.recorded_at,
        })
    }

    /// The capture form is served whatever the session state; `active` says
    /// whether a submission would be accepted.
    pub fn photo_form(&self, session_id: Uuid, student_id: Uuid, now: NaiveDateTime) -> Result<PhotoFormView> {
        let session = self
            .storage
            .sessions
            .get(session_id)?
            .ok_or(AttendanceError::SessionNotFound(session_id))?;
        let student = self
            .storage
            .students
            .get(student_id)?
            .ok_or(AttendanceError::SubjectNotFound(student_id))?;

        Ok(PhotoFormView {
            session: SessionView::new(&session, now),
            student_id,
            student_name: student.full_name(),
            has_reference_photo: student.has_reference_photo(),
            active: can_view_reference_face(&session.window, now),
        })
    }

    pub fn attendance_sheet(&self, token: &str, session_id: Uuid, now: NaiveDateTime) -> Result<AttendanceSheet> {
        let claims = self.teacher(token)?;
        let session = self
            .storage
            .sessions
            .get(session_id)?
            .ok_or(AttendanceError::SessionNotFound(session_id))?;

        if session.teacher_id != claims.sub {
            tracing::warn!("Teacher {} asked for attendance of session {}", claims.sub, session_id);
            return Err(AttendanceError::Forbidden(
                "only the session owner can view its attendance".to_string()
            ));
        }

        let mut entries = Vec::new();
        for record in self.storage.attendance.list_for_session(session_id)? {
            let student = self.storage.students.get(record.student_id)?;
            entries.push(AttendanceEntry {
                attendance_id: record.id,
                student_id: record.student_id,
                student_name: student
                    .as_ref()
                    .map(|s| s.full_name())
                    .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
                registration: student.map(|s| s.registration),
                recorded_at: record.recorded_at,
                similarity_percent: record.similarity * 100.0,
            });
        }

        Ok(AttendanceSheet {
            session: SessionView::new(&session, now),
            entries,
        })
    }
}
