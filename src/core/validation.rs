//! Ordered checks that gate the creation of an attendance record.
//!
//! Every stage has the same signature and runs strictly in order; the first
//! failing stage aborts the chain and its error is returned unchanged. Cheap
//! format and existence checks come before the image comparison so that
//! malformed requests never pay for feature extraction.

use uuid::Uuid;
use crate::common::{AttendanceError, Result};
use crate::core::features::ImageFeatures;
use crate::core::photo::validate_image;
use crate::core::similarity::similarity_score;
use crate::storage::{AttendanceLedger, SubjectRegistry};

/// One check-in attempt as it travels through the chain.
#[derive(Debug, Clone)]
pub struct CheckinRequest {
    pub candidate_photo: String,
    pub session_id: Uuid,
    pub student_id: Uuid,
    /// Filled by the subject existence stage.
    pub reference_photo: Option<String>,
    /// Filled by the similarity stage.
    pub similarity: Option<f64>,
}

impl CheckinRequest {
    pub fn new(candidate_photo: impl Into<String>, session_id: Uuid, student_id: Uuid) -> Self {
        Self {
            candidate_photo: candidate_photo.into(),
            session_id,
            student_id,
            reference_photo: None,
            similarity: None,
        }
    }
}

/// Collaborators the stages consult.
pub struct ChainContext<'a> {
    pub subjects: &'a dyn SubjectRegistry,
    pub attendance: &'a dyn AttendanceLedger,
    pub similarity_threshold: f64,
}

pub type Stage = fn(&mut CheckinRequest, &ChainContext<'_>) -> Result<()>;

pub const STAGES: [(&str, Stage); 6] = [
    ("image_format", check_image_format),
    ("identifier_format", check_identifiers),
    ("subject_exists", check_subject_exists),
    ("reference_photo", check_reference_photo),
    ("similarity", check_similarity),
    ("duplicate", check_duplicate),
];

/// Runs every stage in order and returns the similarity score on success.
pub fn run_chain(request: &mut CheckinRequest, ctx: &ChainContext<'_>) -> Result<f64> {
    run_stages(&STAGES, request, ctx)?;

    request.similarity.ok_or_else(|| {
        AttendanceError::Other(anyhow::anyhow!("validation finished without a similarity score"))
    })
}

pub fn run_stages(
    stages: &[(&str, Stage)],
    request: &mut CheckinRequest,
    ctx: &ChainContext<'_>,
) -> Result<()> {
    for (name, stage) in stages {
        if let Err(e) = stage(request, ctx) {
            tracing::debug!("Check-in rejected at stage {}: {}", name, e);
            return Err(e);
        }
    }
    Ok(())
}

pub fn check_image_format(request: &mut CheckinRequest, _ctx: &ChainContext<'_>) -> Result<()> {
    validate_image(&request.candidate_photo)?;
    Ok(())
}

pub fn check_identifiers(request: &mut CheckinRequest, _ctx: &ChainContext<'_>) -> Result<()> {
    if request.session_id.is_nil() {
        return Err(AttendanceError::InvalidIdentifier("session"));
    }
    if request.student_id.is_nil() {
        return Err(AttendanceError::InvalidIdentifier("student"));
    }
    Ok(())
}

pub fn check_subject_exists(request: &mut CheckinRequest, ctx: &ChainContext<'_>) -> Result<()> {
    let student = ctx
        .subjects
        .find_subject(request.student_id)?
        .ok_or(AttendanceError::SubjectNotFound(request.student_id))?;

    request.reference_photo = Some(student.reference_photo);
    Ok(())
}

pub fn check_reference_photo(request: &mut CheckinRequest, _ctx: &ChainContext<'_>) -> Result<()> {
    match request.reference_photo.as_deref() {
        Some(photo) if !photo.trim().is_empty() => Ok(()),
        _ => Err(AttendanceError::MissingReferencePhoto(request.student_id)),
    }
}

pub fn check_similarity(request: &mut CheckinRequest, ctx: &ChainContext<'_>) -> Result<()> {
    let reference = request
        .reference_photo
        .as_deref()
        .ok_or(AttendanceError::MissingReferencePhoto(request.student_id))?;

    let reference_features = ImageFeatures::extract(reference)?;
    let candidate_features = ImageFeatures::extract(&request.candidate_photo)?;
    let score = similarity_score(&reference_features, &candidate_features);

    if score < ctx.similarity_threshold {
        return Err(AttendanceError::SimilarityBelowThreshold {
            score,
            threshold: ctx.similarity_threshold,
        });
    }

    request.similarity = Some(score);
    Ok(())
}

pub fn check_duplicate(request: &mut CheckinRequest, ctx: &ChainContext<'_>) -> Result<()> {
    if ctx.attendance.exists(request.student_id, request.session_id)? {
        return Err(AttendanceError::DuplicateCheckin {
            student_id: request.student_id,
            session_id: request.session_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::test_images::*;
    use crate::core::similarity::SAME_PERSON_THRESHOLD;
    use crate::storage::{AttendanceRecord, Student, STORAGE_VERSION};
    use image::ImageOutputFormat;
    use std::cell::Cell;

    struct CountingRegistry {
        student: Option<Student>,
        calls: Cell<u32>,
    }

    impl SubjectRegistry for CountingRegistry {
        fn find_subject(&self, _id: Uuid) -> Result<Option<Student>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.student.clone())
        }
    }

    struct CountingLedger {
        existing: bool,
        exists_calls: Cell<u32>,
    }

    impl AttendanceLedger for CountingLedger {
        fn exists(&self, _student_id: Uuid, _session_id: Uuid) -> Result<bool> {
            self.exists_calls.set(self.exists_calls.get() + 1);
            Ok(self.existing)
        }

        fn insert(&self, _record: &AttendanceRecord) -> Result<()> {
            unreachable!("the chain never persists")
        }
    }

    fn student_with_photo(photo: &str) -> Student {
        Student {
            version: STORAGE_VERSION,
            id: Uuid::new_v4(),
            first_name: "Ana".into(),
            last_name: "Rojas".into(),
            registration: "A1".into(),
            reference_photo: photo.into(),
        }
    }

    fn fixtures(student: Option<Student>, existing: bool) -> (CountingRegistry, CountingLedger) {
        (
            CountingRegistry { student, calls: Cell::new(0) },
            CountingLedger { existing, exists_calls: Cell::new(0) },
        )
    }

    fn ctx<'a>(registry: &'a CountingRegistry, ledger: &'a CountingLedger) -> ChainContext<'a> {
        ChainContext {
            subjects: registry,
            attendance: ledger,
            similarity_threshold: SAME_PERSON_THRESHOLD,
        }
    }

    fn photo() -> String {
        encode(&gradient(32, 24), ImageOutputFormat::Png)
    }

    #[test]
    fn bad_image_stops_before_any_collaborator_is_called() {
        let (registry, ledger) = fixtures(Some(student_with_photo(&photo())), false);
        let mut request = CheckinRequest::new("%%%not-base64", Uuid::new_v4(), Uuid::new_v4());

        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidEncoding(_)));
        assert_eq!(registry.calls.get(), 0);
        assert_eq!(ledger.exists_calls.get(), 0);
        assert!(request.reference_photo.is_none());
    }

    #[test]
    fn nil_identifiers_are_rejected() {
        let (registry, ledger) = fixtures(None, false);
        let mut request = CheckinRequest::new(photo(), Uuid::nil(), Uuid::new_v4());
        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidIdentifier("session")));

        let mut request = CheckinRequest::new(photo(), Uuid::new_v4(), Uuid::nil());
        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidIdentifier("student")));
        assert_eq!(registry.calls.get(), 0);
    }

    #[test]
    fn unknown_student_is_rejected() {
        let (registry, ledger) = fixtures(None, false);
        let mut request = CheckinRequest::new(photo(), Uuid::new_v4(), Uuid::new_v4());
        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::SubjectNotFound(_)));
        assert_eq!(registry.calls.get(), 1);
        assert_eq!(ledger.exists_calls.get(), 0);
    }

    #[test]
    fn missing_reference_photo_is_rejected() {
        let (registry, ledger) = fixtures(Some(student_with_photo("")), false);
        let mut request = CheckinRequest::new(photo(), Uuid::new_v4(), Uuid::new_v4());
        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::MissingReferencePhoto(_)));
        assert_eq!(ledger.exists_calls.get(), 0);
    }

    #[test]
    fn dissimilar_photo_is_rejected_before_duplicate_check() {
        let reference = encode(&solid(64, 64, [250, 250, 250]), ImageOutputFormat::Png);
        let candidate = encode(&solid(8, 8, [5, 5, 5]), ImageOutputFormat::Png);
        let (registry, ledger) = fixtures(Some(student_with_photo(&reference)), true);
        let mut request = CheckinRequest::new(candidate, Uuid::new_v4(), Uuid::new_v4());

        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        match err {
            AttendanceError::SimilarityBelowThreshold { score, threshold } => {
                assert!(score < threshold);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.exists_calls.get(), 0);
        assert!(request.similarity.is_none());
    }

    #[test]
    fn existing_record_is_a_duplicate_even_for_a_perfect_match() {
        let reference = photo();
        let (registry, ledger) = fixtures(Some(student_with_photo(&reference)), true);
        let mut request = CheckinRequest::new(reference, Uuid::new_v4(), Uuid::new_v4());

        let err = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateCheckin { .. }));
        assert_eq!(ledger.exists_calls.get(), 1);
    }

    #[test]
    fn passing_chain_returns_and_attaches_score() {
        let reference = photo();
        let (registry, ledger) = fixtures(Some(student_with_photo(&reference)), false);
        let mut request = CheckinRequest::new(reference, Uuid::new_v4(), Uuid::new_v4());

        let score = run_chain(&mut request, &ctx(&registry, &ledger)).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
        assert_eq!(request.similarity, Some(score));
        assert_eq!(registry.calls.get(), 1);
        assert_eq!(ledger.exists_calls.get(), 1);
    }

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<&str> = STAGES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["image_format", "identifier_format", "subject_exists", "reference_photo", "similarity", "duplicate"]
        );
    }
}
