//! Protocol engine contract
//!
//! The engine owns the SMB2 wire protocol: transport, framing, negotiation,
//! signing, credits and request correlation. The session core drives it
//! through the blocking calls of [`ProtocolEngine`] and never looks inside
//! the descriptors it hands out.

pub mod flags;
pub mod local;

pub use flags::{CreateDisposition, DesiredAccess, FileAttributes, OpenFlags};
pub use local::LocalEngine;

use crate::error::NtStatus;
use uuid::Uuid;

/// Opaque token for an open file, minted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDescriptor(u64);

impl FileDescriptor {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Opaque token for an open directory listing, minted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirDescriptor(u64);

impl DirDescriptor {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Origin for an engine-side seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// The engine's native stat record
///
/// Times are Unix epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttributes {
    pub attributes: FileAttributes,
    pub file_id: u64,
    pub nlink: u32,
    pub size: u64,
    pub allocation_size: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub btime: u64,
}

/// One entry produced by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub attributes: RawAttributes,
}

/// Credentials handed to the engine before connecting
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub workstation: String,
    pub client_guid: Uuid,
}

/// Blocking SMB2 protocol engine
///
/// An engine is not safe for concurrent use; the session serializes every
/// call. Dropping the engine destroys it and releases its transport.
///
/// Numeric results follow the engine convention: a negative value signals
/// failure, and the reason is available from [`ProtocolEngine::last_error`].
pub trait ProtocolEngine: Send {
    /// Record credentials for the next connect
    fn set_credentials(&mut self, credentials: &Credentials);

    /// Negotiate, authenticate and tree-connect to `share` on `host`
    fn connect_share(&mut self, host: &str, share: &str, user: &str) -> NtStatus;

    /// Tree-disconnect and log off
    fn disconnect_share(&mut self);

    /// Open a regular file
    fn open(&mut self, path: &str, flags: OpenFlags) -> Option<FileDescriptor>;

    /// Open a directory listing positioned at its first entry
    fn open_dir(&mut self, path: &str) -> Option<DirDescriptor>;

    /// Query attributes of an open file
    fn fstat(&mut self, fd: FileDescriptor) -> Option<RawAttributes>;

    /// Read up to `buf.len()` bytes at `offset`; returns the byte count or a negative value
    fn read_at(&mut self, fd: FileDescriptor, buf: &mut [u8], offset: u64) -> i64;

    /// Write at the engine-side offset of `fd` and advance it
    fn write(&mut self, fd: FileDescriptor, buf: &[u8]) -> i64;

    /// Move the engine-side offset of `fd`; returns the new offset or a negative value
    fn seek(&mut self, fd: FileDescriptor, offset: i64, whence: Whence) -> i64;

    /// Next entry of a listing, `None` once exhausted
    fn read_dir_entry(&mut self, dir: DirDescriptor) -> Option<DirEntry>;

    fn close_file(&mut self, fd: FileDescriptor);

    fn close_dir(&mut self, dir: DirDescriptor);

    /// Text describing the most recent failure
    fn last_error(&self) -> String;
}
