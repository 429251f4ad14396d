use chrono::Duration;
use rollcall::accounts::{NewTeacher, TeacherAccounts, TokenSigner};
use rollcall::protocol::{read_message, write_message, Request};
use rollcall::{AppState, AttendanceError, Config, ServiceClient, Storage};
use std::os::unix::net::UnixListener;
use std::sync::Arc;
use uuid::Uuid;

/// Serves `connections` connections on a temporary socket, one thread each.
fn serve(listener: UnixListener, app: Arc<AppState>, connections: usize) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut workers = Vec::new();
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.unwrap();
            let app = Arc::clone(&app);
            workers.push(std::thread::spawn(move || {
                // probe connections close without sending anything
                if let Ok(request) = read_message::<Request, _>(&mut stream, 1024 * 1024) {
                    write_message(&mut stream, &app.handle(request)).unwrap();
                }
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }
    })
}

#[test]
fn client_round_trips_through_the_socket() {
    let tmp = tempfile::tempdir().unwrap();
    let socket = tmp.path().join("rollcall.sock");
    let listener = UnixListener::bind(&socket).unwrap();

    let signer = TokenSigner::new("socket-secret", Duration::hours(24)).unwrap();
    let storage = Storage::open(&tmp.path().join("data")).unwrap();
    let app = Arc::new(AppState::new(Config::default(), storage, TeacherAccounts::new(signer, 10)));

    // every call is a liveness probe plus the request itself
    let server = serve(listener, app, 6);
    let client = ServiceClient::with_socket(&socket);

    let (profile, token) = client
        .register_teacher(NewTeacher {
            email: "luis@school.edu".into(),
            first_name: "Luis".into(),
            last_name: "Paz".into(),
            password: "secreto".into(),
        })
        .unwrap();
    assert_eq!(profile.email, "luis@school.edu");

    let session = client.create_session(&token, "2030-01-01", "08:00", "09:00").unwrap();
    assert!(!session.active);

    let err = client.attendance_sheet("forged.token.value", session.id).unwrap_err();
    assert!(matches!(err, AttendanceError::Unauthorized(_)), "{err}");

    server.join().unwrap();
}

#[test]
fn unknown_session_detail_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let socket = tmp.path().join("rollcall.sock");
    let listener = UnixListener::bind(&socket).unwrap();

    let signer = TokenSigner::new("socket-secret", Duration::hours(24)).unwrap();
    let storage = Storage::open(&tmp.path().join("data")).unwrap();
    let app = Arc::new(AppState::new(Config::default(), storage, TeacherAccounts::new(signer, 10)));

    let server = serve(listener, app, 2);
    let err = ServiceClient::with_socket(&socket)
        .session_detail(Uuid::new_v4())
        .unwrap_err();
    assert!(err.to_string().contains("session not found"), "{err}");

    server.join().unwrap();
}
