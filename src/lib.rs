pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod hash;
pub mod service;
pub mod staleness;
pub mod storage;

pub use error::{Result, RfpError};
pub use service::RfpService;
pub use staleness::check_section_staleness;
pub use storage::{DocumentStore, LoroStore};
