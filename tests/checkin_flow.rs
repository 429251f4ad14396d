use chrono::{Duration, NaiveDateTime};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use rollcall::accounts::{NewTeacher, TeacherAccounts, TokenSigner};
use rollcall::core::photo::encode_base64;
use rollcall::core::roster::StudentForm;
use rollcall::protocol::{CheckinSubmission, Request, Response};
use rollcall::{AppState, AttendanceError, Config, Storage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

fn png(img: RgbImage) -> String {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    encode_base64(buf.get_ref())
}

fn face() -> String {
    png(RgbImage::from_fn(40, 40, |x, y| {
        Rgb([(x * 6) as u8, (y * 6) as u8, ((x + y) * 3) as u8])
    }))
}

fn other_face() -> String {
    png(RgbImage::from_pixel(6, 6, Rgb([3, 3, 3])))
}

fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").unwrap()
}

fn app(dir: &Path) -> AppState {
    let signer = TokenSigner::new("integration-secret", Duration::hours(24)).unwrap();
    AppState::new(Config::default(), Storage::open(dir).unwrap(), TeacherAccounts::new(signer, 10))
}

struct Classroom {
    token: String,
    session_id: Uuid,
    student_id: Uuid,
}

fn classroom(app: &AppState) -> Classroom {
    let token = match app.handle(Request::RegisterTeacher(NewTeacher {
        email: "docente@school.edu".into(),
        first_name: "Luis".into(),
        last_name: "Paz".into(),
        password: "secreto".into(),
    })) {
        Response::Teacher { token: Some(token), .. } => token,
        other => panic!("unexpected response: {:?}", other),
    };

    let session = app
        .create_session(&token, "2025-09-13", "11:33", "12:33", at("2025-09-13 11:00"))
        .unwrap();
    let student = app
        .register_student(&token, &StudentForm {
            first_name: Some("Ana".into()),
            last_name: Some("Rojas".into()),
            registration: Some("A100".into()),
            reference_photo: Some(face()),
        })
        .unwrap();

    Classroom { token, session_id: session.id, student_id: student.id }
}

fn submit(app: &AppState, room: &Classroom, photo: String, now: &str) -> Response {
    app.handle_at(
        Request::CheckIn(CheckinSubmission {
            session_id: room.session_id,
            student_id: room.student_id,
            photo,
        }),
        at(now),
    )
}

fn rejection_code(response: Response) -> String {
    match response {
        Response::Rejected { code, .. } => code,
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[test]
fn check_in_once_then_duplicate() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let room = classroom(&app);

    match submit(&app, &room, face(), "2025-09-13 12:00") {
        Response::CheckedIn(receipt) => {
            assert!((receipt.similarity - 1.0).abs() < 1e-9);
            assert_eq!(receipt.recorded_at, at("2025-09-13 12:00"));
        }
        other => panic!("unexpected response: {:?}", other),
    }

    assert_eq!(rejection_code(submit(&app, &room, face(), "2025-09-13 12:10")), "duplicate_checkin");

    let sheet = app
        .attendance_sheet(&room.token, room.session_id, at("2025-09-13 13:00"))
        .unwrap();
    assert_eq!(sheet.entries.len(), 1);
    assert_eq!(sheet.entries[0].student_name, "Ana Rojas");
    assert_eq!(sheet.entries[0].registration.as_deref(), Some("A100"));
    assert!((sheet.entries[0].similarity_percent - 100.0).abs() < 1e-6);
}

#[test]
fn window_boundaries_gate_check_in() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let room = classroom(&app);

    assert_eq!(rejection_code(submit(&app, &room, face(), "2025-09-13 11:32")), "session_inactive");
    assert_eq!(rejection_code(submit(&app, &room, face(), "2025-09-13 12:34")), "session_inactive");
    assert_eq!(rejection_code(submit(&app, &room, face(), "2025-09-14 12:00")), "session_inactive");
    assert!(matches!(
        submit(&app, &room, face(), "2025-09-13 12:33"),
        Response::CheckedIn(_)
    ));
}

#[test]
fn rejected_photos_leave_no_record() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let room = classroom(&app);

    assert_eq!(
        rejection_code(submit(&app, &room, other_face(), "2025-09-13 12:00")),
        "similarity_below_threshold"
    );
    assert_eq!(
        rejection_code(submit(&app, &room, "not base64 at all!".into(), "2025-09-13 12:00")),
        "invalid_encoding"
    );

    let sheet = app
        .attendance_sheet(&room.token, room.session_id, at("2025-09-13 13:00"))
        .unwrap();
    assert!(sheet.entries.is_empty());
}

#[test]
fn unknown_ids_are_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let room = classroom(&app);

    let stranger = Classroom { student_id: Uuid::new_v4(), ..room };
    assert_eq!(rejection_code(submit(&app, &stranger, face(), "2025-09-13 12:00")), "subject_not_found");

    let nowhere = Classroom { session_id: Uuid::new_v4(), ..stranger };
    assert_eq!(rejection_code(submit(&app, &nowhere, face(), "2025-09-13 12:00")), "session_not_found");
}

#[test]
fn concurrent_check_ins_record_exactly_one() {
    let tmp = tempfile::tempdir().unwrap();
    let app = Arc::new(app(tmp.path()));
    let room = classroom(&app);
    let photo = face();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            let submission = CheckinSubmission {
                session_id: room.session_id,
                student_id: room.student_id,
                photo: photo.clone(),
            };
            std::thread::spawn(move || app.check_in(submission, at("2025-09-13 12:00")))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(result, AttendanceError::DuplicateCheckin { .. }), "{result}");
    }

    let sheet = app
        .attendance_sheet(&room.token, room.session_id, at("2025-09-13 13:00"))
        .unwrap();
    assert_eq!(sheet.entries.len(), 1);
}
