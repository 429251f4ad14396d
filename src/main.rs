use rollcall::{
    accounts::NewTeacher,
    cli::{report, TokenCache},
    common::{token_cache_file, Config, DevMode},
    core::{compare_faces, photo::encode_base64, roster::StudentForm},
    service::ServiceClient,
};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Classroom attendance with photo check-in")]
struct Cli {
    /// Enable development mode (local data, auto-started service)
    #[arg(long, global = true)]
    dev: bool,

    /// Teacher token; defaults to the one cached by the last login
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Teacher accounts
    Teacher {
        #[command(subcommand)]
        command: TeacherCommands,
    },
    /// Attendance sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Student roster
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },
    /// Check a student into a session with a photo
    Checkin {
        #[arg(long)]
        session: Uuid,
        #[arg(long)]
        student: Uuid,
        /// JPEG or PNG file
        #[arg(long)]
        photo: PathBuf,
        /// Only show the capture form state, do not submit
        #[arg(long)]
        preview: bool,
    },
    /// Show who checked into a session
    Attendance {
        #[arg(long)]
        session: Uuid,
    },
    /// Compare two photos locally
    Compare {
        reference: PathBuf,
        candidate: PathBuf,
        /// Override the configured threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[derive(Subcommand)]
enum TeacherCommands {
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the logged-in teacher
    Whoami,
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    Create {
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        start: String,
        /// HH:MM
        #[arg(long)]
        end: String,
    },
    List,
    Show {
        id: Uuid,
    },
}

#[derive(Args)]
struct StudentFields {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    /// Enrollment code, at most 10 characters
    #[arg(long)]
    registration: Option<String>,
    /// Reference photo (JPEG or PNG)
    #[arg(long)]
    photo: Option<PathBuf>,
}

#[derive(Subcommand)]
enum StudentCommands {
    Register {
        #[command(flatten)]
        fields: StudentFields,
    },
    Update {
        id: Uuid,
        #[command(flatten)]
        fields: StudentFields,
    },
    List,
    Show {
        id: Uuid,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let tokens = TokenCache::new(token_cache_file(&dev_mode)?);
    let client = ServiceClient::new(&dev_mode);

    match cli.command {
        Commands::Teacher { command } => match command {
            TeacherCommands::Register { email, first_name, last_name, password } => {
                let (profile, token) =
                    client.register_teacher(NewTeacher { email, first_name, last_name, password })?;
                tokens.save(&token)?;
                println!("✅ Registered {} {} <{}>", profile.first_name, profile.last_name, profile.email);
            }
            TeacherCommands::Login { email, password } => {
                let (profile, token) = client.login(&email, &password)?;
                tokens.save(&token)?;
                println!("✅ Logged in as {} {}", profile.first_name, profile.last_name);
            }
            TeacherCommands::Logout => {
                tokens.clear()?;
                println!("Logged out");
            }
            TeacherCommands::Whoami => {
                let profile = client.profile(&tokens.resolve(cli.token)?)?;
                println!("{} {} <{}> ({})", profile.first_name, profile.last_name, profile.email, profile.id);
            }
            TeacherCommands::Update { first_name, last_name } => {
                let profile = client.update_teacher(&tokens.resolve(cli.token)?, first_name, last_name)?;
                println!("✅ Updated: {} {}", profile.first_name, profile.last_name);
            }
        },
        Commands::Session { command } => match command {
            SessionCommands::Create { date, start, end } => {
                let session = client.create_session(&tokens.resolve(cli.token)?, &date, &start, &end)?;
                println!("✅ Created session {}", report::format_session(&session));
            }
            SessionCommands::List => {
                let sessions = client.list_sessions(&tokens.resolve(cli.token)?)?;
                print!("{}", report::format_sessions(&sessions));
            }
            SessionCommands::Show { id } => {
                println!("{}", report::format_session(&client.session_detail(id)?));
            }
        },
        Commands::Student { command } => match command {
            StudentCommands::Register { fields } => {
                let student = client.register_student(&tokens.resolve(cli.token)?, student_form(fields)?)?;
                println!("✅ Registered student {} ({})", student.id, student.registration);
            }
            StudentCommands::Update { id, fields } => {
                let student = client.update_student(&tokens.resolve(cli.token)?, id, student_form(fields)?)?;
                println!("✅ Updated student {} {} ({})", student.first_name, student.last_name, student.registration);
            }
            StudentCommands::List => {
                let students = client.list_students(&tokens.resolve(cli.token)?)?;
                print!("{}", report::format_students(&students));
            }
            StudentCommands::Show { id } => {
                let student = client.get_student(&tokens.resolve(cli.token)?, id)?;
                print!("{}", report::format_students(std::slice::from_ref(&student)));
            }
        },
        Commands::Checkin { session, student, photo, preview } => {
            let form = client.photo_form(session, student)?;
            print!("{}", report::format_photo_form(&form));
            if preview {
                return Ok(());
            }

            let receipt = client.check_in(session, student, read_photo(&photo)?)?;
            println!(
                "✅ Attendance recorded at {} (similarity {:.1}%)",
                receipt.recorded_at.format("%H:%M:%S"),
                receipt.similarity * 100.0
            );
        }
        Commands::Attendance { session } => {
            let sheet = client.attendance_sheet(&tokens.resolve(cli.token)?, session)?;
            print!("{}", report::format_attendance(&sheet));
        }
        Commands::Compare { reference, candidate, threshold } => {
            let config = Config::discover(cli.dev)?;
            let threshold = threshold.unwrap_or(config.checkin.similarity_threshold);
            let comparison = compare_faces(&read_photo(&reference)?, &read_photo(&candidate)?, threshold)?;
            print!("{}", report::format_comparison(&comparison, threshold));
        }
    }

    Ok(())
}

fn read_photo(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(encode_base64(&bytes))
}

fn student_form(fields: StudentFields) -> Result<StudentForm> {
    Ok(StudentForm {
        first_name: fields.first_name,
        last_name: fields.last_name,
        registration: fields.registration,
        reference_photo: fields.photo.as_deref().map(read_photo).transpose()?,
    })
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }
}
