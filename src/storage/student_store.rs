use std::path::Path;
use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::storage::files::{index_key, RecordDir};
use crate::storage::records::{Student, STORAGE_VERSION};
use crate::storage::SubjectRegistry;

pub struct StudentStore {
    records: RecordDir,
    registrations: RecordDir,
}

impl StudentStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            records: RecordDir::open(data_dir.join("students"))?,
            registrations: RecordDir::open(data_dir.join("student_registrations"))?,
        })
    }

    /// Adds a new student, claiming its registration code first.
    pub fn insert(&self, student: &Student) -> Result<()> {
        if !self.registrations.insert_new(&index_key(&student.registration), &student.id)? {
            return Err(AttendanceError::Conflict(format!(
                "student with registration {} already exists", student.registration
            )));
        }

        if !self.records.insert_new(&student.id.to_string(), student)? {
            self.registrations.remove(&index_key(&student.registration))?;
            return Err(AttendanceError::Storage(format!("student id {} already used", student.id)));
        }

        Ok(())
    }

    /// Replaces a stored student. `previous_registration` is the code it was
    /// stored under, so a changed code can be moved in the index.
    pub fn update(&self, student: &Student, previous_registration: &str) -> Result<()> {
        let new_key = index_key(&student.registration);
        let old_key = index_key(previous_registration);

        if new_key != old_key {
            if !self.registrations.insert_new(&new_key, &student.id)? {
                return Err(AttendanceError::Conflict(format!(
                    "student with registration {} already exists", student.registration
                )));
            }
            self.registrations.remove(&old_key)?;
        }

        self.records.save(&student.id.to_string(), student)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Student>> {
        let student: Option<Student> = self.records.load(&id.to_string())?;
        Ok(student.map(migrate))
    }

    pub fn find_by_registration(&self, registration: &str) -> Result<Option<Student>> {
        match self.registrations.load::<Uuid>(&index_key(registration))? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// All students, sorted by last then first name.
    pub fn list(&self) -> Result<Vec<Student>> {
        let mut students: Vec<Student> = self.records.load_all()?;
        students.sort_by(|a, b| {
            a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        });
        Ok(students.into_iter().map(migrate).collect())
    }
}

impl SubjectRegistry for StudentStore {
    fn find_subject(&self, id: Uuid) -> Result<Option<Student>> {
        self.get(id)
    }
}

fn migrate(mut student: Student) -> Student {
    // Handle version migration if needed
    if student.version < STORAGE_VERSION {
        student.version = STORAGE_VERSION;
    }
    student
}
