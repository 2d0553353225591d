//! Shared building blocks for threadcard: identifiers, property schema types,
//! per-channel configuration, the application config file and the top-level
//! error type.

pub mod channel_store;
pub mod config;
pub mod error;
pub mod types;

pub use channel_store::{ChannelConfigStore, ConfigPatch};
pub use config::ThreadcardConfig;
pub use error::{Result, ThreadcardError};
pub use types::*;
