//! Error types for the SMB session core

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for SMB session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for session and file-handle operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connecting to the share failed; the engine has been torn down
    #[error("unable to connect to {host}, code {status}, {message}")]
    ConnectionFailed {
        host: String,
        status: NtStatus,
        message: String,
    },

    /// Operation attempted on a session without a live engine
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Neither a file nor a directory could be opened at the path
    #[error("file open failed {0}")]
    NotFound(String),

    /// No more data, or the handle is no longer usable
    #[error("end of stream")]
    EndOfStream,

    /// The engine rejected a write
    #[error("write error {0}")]
    WriteFailed(String),

    /// The engine rejected a seek
    #[error("seek error: {0}")]
    SeekFailed(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Access denied
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl Error {
    /// True for the end-of-stream signal rather than a real failure
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Io(e) => e.kind(),
            Error::EndOfStream => io::ErrorKind::UnexpectedEof,
            Error::NotFound(_) => io::ErrorKind::NotFound,
            Error::AccessDenied(_) => io::ErrorKind::PermissionDenied,
            Error::InvalidParameter(_) => io::ErrorKind::InvalidInput,
            Error::ConnectionFailed { .. } => io::ErrorKind::NotConnected,
            Error::InvalidState(_) => io::ErrorKind::NotConnected,
            Error::WriteFailed(_) | Error::SeekFailed(_) => io::ErrorKind::Other,
        };
        match err {
            Error::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

/// Engine status codes (subset of NTSTATUS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NtStatus {
    /// The operation completed successfully
    Success = 0x00000000,
    /// Unspecified failure
    Unsuccessful = 0xC0000001,
    /// The specified handle is invalid
    InvalidHandle = 0xC0000008,
    /// The parameter is incorrect
    InvalidParameter = 0xC000000D,
    /// End of file reached
    EndOfFile = 0xC0000011,
    /// Access denied
    AccessDenied = 0xC0000022,
    /// The object name is not found
    ObjectNameNotFound = 0xC0000034,
    /// Cannot create a file that already exists
    ObjectNameCollision = 0xC0000035,
    /// A path component is missing
    ObjectPathNotFound = 0xC000003A,
    /// The user name or password is incorrect
    LogonFailure = 0xC000006D,
    /// The target is a directory
    FileIsADirectory = 0xC00000BA,
    /// The target is not a directory
    NotADirectory = 0xC0000103,
    /// Bad network name (share does not exist)
    BadNetworkName = 0xC00000CC,
    /// The remote system is not reachable
    HostUnreachable = 0xC000023D,
    /// No more files
    NoMoreFiles = 0x80000006,
}

impl NtStatus {
    /// Check if this is a success status
    pub fn is_success(self) -> bool {
        self == NtStatus::Success
    }

    /// Check if this is an error status
    pub fn is_error(self) -> bool {
        (self as u32) & 0xC0000000 == 0xC0000000
    }

    /// Check if this is a warning status
    pub fn is_warning(self) -> bool {
        (self as u32) & 0x80000000 == 0x80000000 && !self.is_error()
    }

    /// Map a local I/O failure onto the closest status
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => NtStatus::ObjectNameNotFound,
            io::ErrorKind::PermissionDenied => NtStatus::AccessDenied,
            io::ErrorKind::AlreadyExists => NtStatus::ObjectNameCollision,
            io::ErrorKind::InvalidInput => NtStatus::InvalidParameter,
            io::ErrorKind::UnexpectedEof => NtStatus::EndOfFile,
            _ => NtStatus::Unsuccessful,
        }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            NtStatus::Success => "Success",
            NtStatus::Unsuccessful => "Unsuccessful",
            NtStatus::InvalidHandle => "Invalid handle",
            NtStatus::InvalidParameter => "Invalid parameter",
            NtStatus::EndOfFile => "End of file",
            NtStatus::AccessDenied => "Access denied",
            NtStatus::ObjectNameNotFound => "Object name not found",
            NtStatus::ObjectNameCollision => "Object name collision",
            NtStatus::ObjectPathNotFound => "Object path not found",
            NtStatus::LogonFailure => "Logon failure",
            NtStatus::FileIsADirectory => "File is a directory",
            NtStatus::NotADirectory => "Not a directory",
            NtStatus::BadNetworkName => "Bad network name",
            NtStatus::HostUnreachable => "Host unreachable",
            NtStatus::NoMoreFiles => "No more files",
        };
        write!(f, "{} (0x{:08X})", msg, *self as u32)
    }
}
