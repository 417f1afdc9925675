//! Policy store access: the admin RPC surface, its transports, and the
//! per-document [`PolicyStore`] client.

pub mod admin;
pub mod client;
pub mod config;
pub mod directory;
mod error;
pub mod qrexec;

pub use admin::PolicyAdmin;
pub use client::{list_names, PolicyStore};
pub use config::StoreConfig;
pub use directory::DirectoryAdmin;
pub use error::{ConfigError, StoreError, StoreErrorKind, StoreOperation};
pub use qrexec::QrexecAdmin;
