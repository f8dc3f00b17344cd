// ABOUTME: SSH client config module: record model, option payloads and the host store
// ABOUTME: Everything that reads, mutates or writes ~/.ssh/config lives under here

pub mod options;
pub mod parser;
pub mod store;
pub mod uri;

pub use options::{DELETED_SIGN, HostOptions, IdentityFile, OptionEdit};
pub use parser::{HostEntry, OptionValue, Options, Record};
pub use store::HostStore;
