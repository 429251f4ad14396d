pub mod client;
pub mod handler;
pub mod protocol;

pub use client::ServiceClient;
pub use handler::AppState;
