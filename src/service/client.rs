use crate::accounts::{NewTeacher, TeacherProfile};
use crate::common::{AttendanceError, DevMode, Result};
use crate::core::roster::StudentForm;
use crate::service::protocol::{
    read_message, write_message, AttendanceSheet, CheckinReceipt, CheckinSubmission,
    PhotoFormView, Request, Response, SessionView, StudentView,
};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use uuid::Uuid;

const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

pub struct ServiceClient {
    socket_path: PathBuf,
    dev_mode: bool,
}

/// Turns a non-matching response into an error.
macro_rules! expect_response {
    ($response:expr, $pattern:pat => $value:expr) => {
        match $response {
            $pattern => Ok($value),
            other => Err(unexpected(other)),
        }
    };
}

impl ServiceClient {
    pub fn new(dev_mode: &DevMode) -> Self {
        ServiceClient {
            socket_path: dev_mode.socket_path(),
            dev_mode: dev_mode.is_enabled(),
        }
    }

    pub fn with_socket(socket_path: impl Into<PathBuf>) -> Self {
        ServiceClient { socket_path: socket_path.into(), dev_mode: false }
    }

    pub fn register_teacher(&self, form: NewTeacher) -> Result<(TeacherProfile, String)> {
        expect_response!(self.call(&Request::RegisterTeacher(form))?,
            Response::Teacher { profile, token: Some(token) } => (profile, token))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(TeacherProfile, String)> {
        let request = Request::Login { email: email.to_string(), password: password.to_string() };
        expect_response!(self.call(&request)?,
            Response::Teacher { profile, token: Some(token) } => (profile, token))
    }

    pub fn profile(&self, token: &str) -> Result<TeacherProfile> {
        let request = Request::Profile { token: token.to_string() };
        expect_response!(self.call(&request)?, Response::Teacher { profile, .. } => profile)
    }

    pub fn update_teacher(
        &self,
        token: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<TeacherProfile> {
        let request = Request::UpdateTeacher { token: token.to_string(), first_name, last_name };
        expect_response!(self.call(&request)?, Response::Teacher { profile, .. } => profile)
    }

    pub fn create_session(&self, token: &str, date: &str, start: &str, end: &str) -> Result<SessionView> {
        let request = Request::CreateSession {
            token: token.to_string(),
            date: date.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        };
        expect_response!(self.call(&request)?, Response::Session(view) => view)
    }

    pub fn list_sessions(&self, token: &str) -> Result<Vec<SessionView>> {
        let request = Request::ListSessions { token: token.to_string() };
        expect_response!(self.call(&request)?, Response::Sessions(views) => views)
    }

    pub fn session_detail(&self, session_id: Uuid) -> Result<SessionView> {
        expect_response!(self.call(&Request::SessionDetail { session_id })?, Response::Session(view) => view)
    }

    pub fn register_student(&self, token: &str, form: StudentForm) -> Result<StudentView> {
        let request = Request::RegisterStudent { token: token.to_string(), form };
        expect_response!(self.call(&request)?, Response::Student(view) => view)
    }

    pub fn update_student(&self, token: &str, student_id: Uuid, form: StudentForm) -> Result<StudentView> {
        let request = Request::UpdateStudent { token: token.to_string(), student_id, form };
        expect_response!(self.call(&request)?, Response::Student(view) => view)
    }

    pub fn list_students(&self, token: &str) -> Result<Vec<StudentView>> {
        let request = Request::ListStudents { token: token.to_string() };
        expect_response!(self.call(&request)?, Response::Students(views) => views)
    }

    pub fn get_student(&self, token: &str, student_id: Uuid) -> Result<StudentView> {
        let request = Request::GetStudent { token: token.to_string(), student_id };
        expect_response!(self.call(&request)?, Response::Student(view) => view)
    }

    pub fn photo_form(&self, session_id: Uuid, student_id: Uuid) -> Result<PhotoFormView> {
        let request = Request::PhotoForm { session_id, student_id };
        expect_response!(self.call(&request)?, Response::PhotoForm(view) => view)
    }

    pub fn check_in(&self, session_id: Uuid, student_id: Uuid, photo: String) -> Result<CheckinReceipt> {
        let request = Request::CheckIn(CheckinSubmission { session_id, student_id, photo });
        expect_response!(self.call(&request)?, Response::CheckedIn(receipt) => receipt)
    }

    pub fn attendance_sheet(&self, token: &str, session_id: Uuid) -> Result<AttendanceSheet> {
        let request = Request::AttendanceSheet { token: token.to_string(), session_id };
        expect_response!(self.call(&request)?, Response::Attendance(sheet) => sheet)
    }

    /// Sends one request and returns the answer. Rejections come back as `Ok`.
    pub fn call(&self, request: &Request) -> Result<Response> {
        self.ensure_service_running()?;
        let mut stream = self.connect_with_retry(3)?;
        write_message(&mut stream, request)?;
        read_message(&mut stream, MAX_RESPONSE_BYTES)
    }

    pub fn ensure_service_running(&self) -> Result<()> {
        if self.socket_path.exists() && UnixStream::connect(&self.socket_path).is_ok() {
            return Ok(());
        }

        // Only auto-start in dev mode
        if !self.dev_mode {
            return Err(AttendanceError::Other(anyhow::anyhow!(
                "Service is not running. Please start it with: sudo systemctl start rollcall"
            )));
        }

        eprintln!("Starting service in development mode...");

        let service_binary = std::env::current_exe()?
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Failed to get binary directory"))?
            .join("rollcall-service");

        if !service_binary.exists() {
            return Err(AttendanceError::Other(anyhow::anyhow!(
                "Service binary not found at {:?}. Please build the project first.", service_binary
            )));
        }

        Command::new(&service_binary)
            .arg("--dev")
            .arg("--dev-socket")
            .arg(&self.socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AttendanceError::Other(anyhow::anyhow!("Failed to start service: {}", e)))?;

        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(500));
            if Path::new(&self.socket_path).exists() {
                eprintln!("Service started successfully");
                return Ok(());
            }
        }

        Err(AttendanceError::Other(anyhow::anyhow!("Service failed to start within timeout")))
    }

    fn connect_with_retry(&self, max_retries: u32) -> Result<UnixStream> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(Duration::from_secs(60)))?;
                    stream.set_write_timeout(Some(Duration::from_secs(10)))?;
                    return Ok(stream);
                }
                Err(e) if attempt < max_retries => {
                    tracing::debug!("Failed to connect (attempt {}): {}", attempt, e);
                    std::thread::sleep(Duration::from_millis(500));
                }
                Err(e) => {
                    return Err(AttendanceError::Other(anyhow::anyhow!(
                        "Failed to connect to service: {}", e
                    )));
                }
            }
        }
    }
}

/// Maps a response that does not answer the request to an error.
fn unexpected(response: Response) -> AttendanceError {
    match response {
        Response::Rejected { code, message } => rejection(&code, message),
        Response::Error(msg) => AttendanceError::Other(anyhow::anyhow!("Service error: {}", msg)),
        other => AttendanceError::Other(anyhow::anyhow!("Unexpected response type: {:?}", other)),
    }
}

/// Rebuilds the closest local error for a rejection code.
fn rejection(code: &str, message: String) -> AttendanceError {
    match code {
        "invalid_credentials" => AttendanceError::InvalidCredentials,
        "session_inactive" => AttendanceError::SessionInactive,
        "unauthorized" => AttendanceError::Unauthorized(message),
        "forbidden" => AttendanceError::Forbidden(message),
        "conflict" => AttendanceError::Conflict(message),
        "invalid_input" => AttendanceError::InvalidInput(message),
        _ => AttendanceError::Other(anyhow::anyhow!(message)),
    }
}
