pub mod config;
pub mod errors;
pub mod metrics;
pub mod types;

pub use errors::DashError;
