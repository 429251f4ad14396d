pub mod password;
pub mod token;

pub use token::{TokenClaims, TokenSigner};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::storage::{Teacher, TeacherStore, STORAGE_VERSION};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Teacher data safe to hand out to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Teacher> for TeacherProfile {
    fn from(teacher: &Teacher) -> Self {
        Self {
            id: teacher.id,
            email: teacher.email.clone(),
            first_name: teacher.first_name.clone(),
            last_name: teacher.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeacher {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Teacher registration, login and token checks.
pub struct TeacherAccounts {
    signer: TokenSigner,
    password_iterations: u32,
}

impl TeacherAccounts {
    pub fn new(signer: TokenSigner, password_iterations: u32) -> Self {
        Self { signer, password_iterations }
    }

    pub fn register(&self, store: &TeacherStore, form: &NewTeacher) -> Result<(TeacherProfile, String)> {
        let email = form.email.trim();
        if !email.contains('@') {
            return Err(AttendanceError::InvalidInput("a valid email is required".to_string()));
        }
        if form.first_name.trim().is_empty() || form.last_name.trim().is_empty() {
            return Err(AttendanceError::InvalidInput("first and last name are required".to_string()));
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AttendanceError::InvalidInput(format!(
                "password must be at least {} characters", MIN_PASSWORD_LEN
            )));
        }

        let now = Utc::now();
        let teacher = Teacher {
            version: STORAGE_VERSION,
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            password_hash: password::hash_password(&form.password, self.password_iterations)?,
            created_at: now,
            updated_at: now,
        };
        store.insert(&teacher)?;
        tracing::info!("Registered teacher {} <{}>", teacher.id, teacher.email);

        let token = self.signer.issue(teacher.id, &teacher.email)?;
        Ok((TeacherProfile::from(&teacher), token))
    }

    pub fn login(&self, store: &TeacherStore, email: &str, password: &str) -> Result<(TeacherProfile, String)> {
        let teacher = store
            .find_by_email(email.trim())?
            .ok_or(AttendanceError::InvalidCredentials)?;

        if !password::verify_password(password, &teacher.password_hash)? {
            tracing::warn!("Failed login for {}", teacher.email);
            return Err(AttendanceError::InvalidCredentials);
        }

        let token = self.signer.issue(teacher.id, &teacher.email)?;
        Ok((TeacherProfile::from(&teacher), token))
    }

    pub fn authenticate(&self, token: &str) -> Result<TokenClaims> {
        self.signer.verify(token)
    }

    pub fn profile(&self, store: &TeacherStore, token: &str) -> Result<TeacherProfile> {
        let teacher = self.current_teacher(store, token)?;
        Ok(TeacherProfile::from(&teacher))
    }

    /// Overwrites the names that are given and non-blank.
    pub fn update(
        &self,
        store: &TeacherStore,
        token: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<TeacherProfile> {
        let mut teacher = self.current_teacher(store, token)?;

        if let Some(v) = first_name.map(str::trim).filter(|v| !v.is_empty()) {
            teacher.first_name = v.to_string();
        }
        if let Some(v) = last_name.map(str::trim).filter(|v| !v.is_empty()) {
            teacher.last_name = v.to_string();
        }
        teacher.updated_at = Utc::now();
        store.save(&teacher)?;

        Ok(TeacherProfile::from(&teacher))
    }

    fn current_teacher(&self, store: &TeacherStore, token: &str) -> Result<Teacher> {
        let claims = self.authenticate(token)?;
        store
            .get(claims.sub)?
            .ok_or_else(|| AttendanceError::Unauthorized("teacher no longer exists".to_string()))
    }
}
