use rollcall::{
    common::{resolve_data_dir, Config, DevMode, Result},
    protocol::{read_message, write_message, Request, Response},
    service::AppState,
};
use anyhow::Context as _;
use clap::Parser;
use std::fs;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "rollcall-service")]
#[command(about = "Rollcall attendance service")]
struct Args {
    /// Run in development mode
    #[arg(long)]
    dev: bool,

    /// Socket path in dev mode
    #[arg(long, default_value = rollcall::common::dev_mode::DEV_SOCKET_PATH)]
    dev_socket: PathBuf,

    /// Base directory for dev data
    #[arg(long, default_value = "./dev_data")]
    dev_data_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting rollcall service (dev_mode: {})", args.dev);

    let dev_mode = DevMode::with_base_dir(args.dev, args.dev_data_dir.clone())?;
    let config = Config::discover(args.dev)?;

    let socket_path = if args.dev {
        args.dev_socket.clone()
    } else {
        config.service.socket_path.clone()
    };
    let data_dir = resolve_data_dir(&config, &dev_mode);
    tracing::info!("Data directory: {}", data_dir.display());

    let state = Arc::new(AppState::open(config, &data_dir, args.dev)?);
    let listener = bind(&socket_path)?;
    tracing::info!("Listening on {}", socket_path.display());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &state) {
                        tracing::error!("Client error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Connection error: {}", e);
            }
        }
    }

    Ok(())
}

fn bind(socket_path: &Path) -> Result<UnixListener> {
    // Clean up old socket if exists
    if socket_path.exists() {
        fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind Unix socket")?;

    // Students and teachers connect as ordinary users; requests carry their own credentials
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(socket_path, fs::Permissions::from_mode(0o666))?;
    }

    Ok(listener)
}

fn handle_client(mut stream: UnixStream, state: &AppState) -> Result<()> {
    let service = &state.config().service;
    stream.set_read_timeout(Some(Duration::from_secs(service.read_timeout_seconds)))?;
    stream.set_write_timeout(Some(Duration::from_secs(service.write_timeout_seconds)))?;

    let response = match read_message::<Request, _>(&mut stream, service.max_message_bytes) {
        Ok(request) => {
            tracing::debug!("Processing {}", request_name(&request));
            state.handle(request)
        }
        Err(e) => {
            tracing::warn!("Bad request: {}", e);
            Response::from_error(&e)
        }
    };

    write_message(&mut stream, &response)
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::RegisterTeacher(_) => "teacher registration",
        Request::Login { .. } => "login",
        Request::Profile { .. } => "profile",
        Request::UpdateTeacher { .. } => "teacher update",
        Request::CreateSession { .. } => "session creation",
        Request::ListSessions { .. } => "session list",
        Request::SessionDetail { .. } => "session detail",
        Request::RegisterStudent { .. } => "student registration",
        Request::UpdateStudent { .. } => "student update",
        Request::ListStudents { .. } => "student list",
        Request::GetStudent { .. } => "student detail",
        Request::PhotoForm { .. } => "photo form",
        Request::CheckIn(_) => "check-in",
        Request::AttendanceSheet { .. } => "attendance sheet",
    }
}
