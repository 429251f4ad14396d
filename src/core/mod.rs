pub mod checkin;
pub mod features;
pub mod photo;
pub mod roster;
pub mod session_window;
pub mod similarity;
pub mod validation;

pub use checkin::CheckinDesk;
pub use features::ImageFeatures;
pub use photo::{decode_image, validate_image};
pub use roster::{register_student, update_student, StudentForm};
pub use session_window::{can_check_in, can_view_reference_face, SessionActivity, SessionWindow};
pub use similarity::{compare_faces, similarity_score, FaceComparison, SAME_PERSON_THRESHOLD};
pub use validation::{run_chain, ChainContext, CheckinRequest};
