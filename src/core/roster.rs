//! Student registration and update, each a fixed sequence of steps:
//! validate input, check precondition, prepare, validate photo, persist.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::core::photo::validate_image;
use crate::storage::{Student, StudentStore, STORAGE_VERSION};

pub const MAX_REGISTRATION_LEN: usize = 10;

/// Submitted student fields. `None` or blank means "not provided".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub registration: Option<String>,
    pub reference_photo: Option<String>,
}

impl StudentForm {
    fn provided(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn is_empty(&self) -> bool {
        Self::provided(&self.first_name).is_none()
            && Self::provided(&self.last_name).is_none()
            && Self::provided(&self.registration).is_none()
            && Self::provided(&self.reference_photo).is_none()
    }
}

pub fn register_student(store: &StudentStore, form: &StudentForm) -> Result<Student> {
    let fields = required_fields(form)?;
    ensure_registration_free(store, &fields.registration)?;
    let student = new_student(fields);
    validate_image(&student.reference_photo)?;

    store.insert(&student)?;
    tracing::info!("Registered student {} ({})", student.id, student.registration);
    Ok(student)
}

pub fn update_student(store: &StudentStore, id: Uuid, form: &StudentForm) -> Result<Student> {
    check_update_input(form)?;
    let existing = store.get(id)?.ok_or(AttendanceError::SubjectNotFound(id))?;
    let previous_registration = existing.registration.clone();
    let student = apply_form(existing, form);
    if let Some(photo) = StudentForm::provided(&form.reference_photo) {
        validate_image(photo)?;
    }

    store.update(&student, &previous_registration)?;
    tracing::info!("Updated student {}", student.id);
    Ok(student)
}

struct RequiredFields {
    first_name: String,
    last_name: String,
    registration: String,
    reference_photo: String,
}

fn required_fields(form: &StudentForm) -> Result<RequiredFields> {
    let field = |value: &Option<String>, name: &str| {
        StudentForm::provided(value)
            .map(str::to_string)
            .ok_or_else(|| AttendanceError::InvalidInput(format!("{} is required", name)))
    };

    let fields = RequiredFields {
        first_name: field(&form.first_name, "first name")?,
        last_name: field(&form.last_name, "last name")?,
        registration: field(&form.registration, "registration")?,
        reference_photo: field(&form.reference_photo, "reference photo")?,
    };
    check_registration(&fields.registration)?;
    Ok(fields)
}

fn ensure_registration_free(store: &StudentStore, registration: &str) -> Result<()> {
    if store.find_by_registration(registration)?.is_some() {
        return Err(AttendanceError::Conflict(format!(
            "student with registration {} already exists", registration
        )));
    }
    Ok(())
}

fn new_student(fields: RequiredFields) -> Student {
    Student {
        version: STORAGE_VERSION,
        id: Uuid::new_v4(),
        first_name: fields.first_name,
        last_name: fields.last_name,
        registration: fields.registration,
        reference_photo: fields.reference_photo,
    }
}

fn check_update_input(form: &StudentForm) -> Result<()> {
    if form.is_empty() {
        return Err(AttendanceError::InvalidInput(
            "at least one field must be provided".to_string()
        ));
    }
    if let Some(registration) = StudentForm::provided(&form.registration) {
        check_registration(registration)?;
    }
    Ok(())
}

fn apply_form(mut student: Student, form: &StudentForm) -> Student {
    if let Some(v) = StudentForm::provided(&form.first_name) {
        student.first_name = v.to_string();
    }
    if let Some(v) = StudentForm::provided(&form.last_name) {
        student.last_name = v.to_string();
    }
    if let Some(v) = StudentForm::provided(&form.registration) {
        student.registration = v.to_string();
    }
    if let Some(v) = StudentForm::provided(&form.reference_photo) {
        student.reference_photo = v.to_string();
    }
    student
}

fn check_registration(registration: &str) -> Result<()> {
    if registration.chars().count() > MAX_REGISTRATION_LEN {
        return Err(AttendanceError::InvalidInput(format!(
            "registration must be at most {} characters", MAX_REGISTRATION_LEN
        )));
    }
    Ok(())
}
