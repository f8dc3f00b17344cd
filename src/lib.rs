// ABOUTME: Library root for storm, a manager for the OpenSSH client config file
// ABOUTME: Exposes the config model, host store, defaults and tool configuration

pub mod config;
pub mod defaults;
pub mod error;
pub mod ssh;

pub use error::{StoreError, StoreResult};
pub use ssh::{HostStore, Record};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
