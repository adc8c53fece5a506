//! SMB2 session and file-handle core
//!
//! Exposes a remote share through a filesystem-like API (open, read, write,
//! seek, stat, readdir, close) on top of a blocking [`ProtocolEngine`] that
//! owns the wire protocol.
//!
//! ```no_run
//! use rust_smb_fs::{LocalEngine, LocalEngineConfig, OpenFlags, Session};
//! use std::io::Read;
//! use std::sync::Arc;
//!
//! # fn main() -> rust_smb_fs::Result<()> {
//! let config = LocalEngineConfig::default().with_share("public", "/srv/public");
//! let session = Arc::new(Session::new(LocalEngine::new(config)));
//! session.connect("localhost", "public", "guest", "")?;
//!
//! let mut file = session.open_file("docs/readme.txt", OpenFlags::READ_ONLY)?;
//! let mut text = String::new();
//! file.read_to_string(&mut text)?;
//! file.close()?;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod file;
pub mod session;
pub mod stat;

#[cfg(test)]
pub mod e2e_tests;

pub use config::{LocalEngineConfig, SessionConfig};
pub use engine::{LocalEngine, OpenFlags, ProtocolEngine};
pub use error::{Error, NtStatus, Result};
pub use file::SmbFile;
pub use session::{Session, SessionStatus};
pub use stat::{FileInfo, FileMode};
