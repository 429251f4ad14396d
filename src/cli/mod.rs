pub mod report;
pub mod token_cache;

pub use token_cache::TokenCache;
