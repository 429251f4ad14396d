// Core modules
pub mod accounts;
pub mod cli;
pub mod common;
pub mod core;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use accounts::{TeacherAccounts, TokenSigner};
pub use common::{AttendanceError, Config, DevMode, Result};
pub use core::{compare_faces, CheckinDesk, FaceComparison, SessionWindow, SAME_PERSON_THRESHOLD};
pub use service::{protocol, AppState, ServiceClient};
pub use storage::Storage;
