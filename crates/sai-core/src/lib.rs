//! Data model, error taxonomy, platform detection, configuration, and host
//! interfaces (`ResourceValidator`, `DefaultsGenerator`) shared by the rest
//! of the sai crates.

pub mod binary;
pub mod config;
pub mod defaults;
pub mod error;
pub mod merge;
pub mod platform;
pub mod provider;
pub mod resource;
pub mod saidata;
pub mod script;
pub mod source;

pub use error::{ErrorKind, Result, SaiError};
pub use merge::MergedView;
pub use platform::Platform;
pub use saidata::Saidata;
