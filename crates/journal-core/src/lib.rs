pub mod config;
pub mod error;
pub mod ids;

pub use config::JournalConfig;
pub use error::{JournalError, Result};
