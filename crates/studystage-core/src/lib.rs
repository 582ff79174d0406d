pub mod config;
pub mod error;
pub mod types;

pub use config::StudyConfig;
pub use error::{Result, StudyError};
pub use types::*;
