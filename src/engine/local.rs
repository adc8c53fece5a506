//! Protocol engine backed by local directories
//!
//! Each configured share maps to a directory on the local filesystem. The
//! engine keeps the same call contract as a networked one, including the
//! engine-side offset used by `write` and `seek` and the last-error text,
//! which makes it suitable for loopback use and for exercising the session
//! core without a server.

use super::{
    Credentials, DirDescriptor, DirEntry, FileAttributes, FileDescriptor, OpenFlags,
    ProtocolEngine, RawAttributes, Whence,
};
use crate::config::LocalEngineConfig;
use crate::engine::CreateDisposition;
use crate::error::NtStatus;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

type EngineResult<T> = std::result::Result<T, (NtStatus, String)>;

/// Open file on the exported directory
struct OpenFile {
    path: PathBuf,
    file: File,
    offset: u64,
    writable: bool,
    append: bool,
}

/// Snapshot of a directory taken at open time
struct Listing {
    entries: VecDeque<DirEntry>,
}

/// Local-directory protocol engine
pub struct LocalEngine {
    config: LocalEngineConfig,
    credentials: Credentials,
    root: Option<PathBuf>,
    files: HashMap<u64, OpenFile>,
    dirs: HashMap<u64, Listing>,
    next_id: u64,
    last_error: String,
}

impl LocalEngine {
    /// Create an engine serving the shares in `config`
    pub fn new(config: LocalEngineConfig) -> Self {
        Self {
            config,
            credentials: Credentials::default(),
            root: None,
            files: HashMap::new(),
            dirs: HashMap::new(),
            next_id: 1,
            last_error: String::new(),
        }
    }

    /// Number of files and listings currently open
    pub fn open_handles(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    fn fail(&mut self, (status, message): (NtStatus, String)) {
        warn!("Engine call failed: {} ({})", message, status);
        self.last_error = format!("{} ({})", message, status);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn root(&self) -> EngineResult<&Path> {
        self.root.as_deref().ok_or_else(|| {
            (
                NtStatus::InvalidHandle,
                "not connected to a share".to_string(),
            )
        })
    }

    /// Resolve a share-relative path, refusing to leave the share root
    fn resolve_path(&self, path: &str) -> EngineResult<PathBuf> {
        let root = self.root()?;
        let clean_path = path.replace('\\', "/");

        let mut full_path = root.to_path_buf();
        for component in clean_path.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    return Err((
                        NtStatus::AccessDenied,
                        format!("path traversal outside share not allowed: {}", path),
                    ))
                }
                name => full_path.push(name),
            }
        }
        Ok(full_path)
    }

    fn check_connect(&self, host: &str, share: &str, user: &str) -> EngineResult<PathBuf> {
        if !host.eq_ignore_ascii_case(&self.config.hostname) {
            return Err((
                NtStatus::HostUnreachable,
                format!("no route to host {}", host),
            ));
        }

        if !self.config.users.is_empty() {
            let accepted = self
                .config
                .users
                .get(user)
                .map(|password| *password == self.credentials.password)
                .unwrap_or(false);
            if !accepted {
                return Err((
                    NtStatus::LogonFailure,
                    format!("authentication failed for user {}", user),
                ));
            }
        }

        let root = self
            .config
            .shares
            .get(&share.to_ascii_uppercase())
            .ok_or_else(|| (NtStatus::BadNetworkName, format!("no such share: {}", share)))?;

        let root = root.canonicalize().map_err(|e| {
            (
                NtStatus::BadNetworkName,
                format!("share {} is unavailable: {}", share, e),
            )
        })?;
        if !root.is_dir() {
            return Err((
                NtStatus::BadNetworkName,
                format!("share {} is not a directory", share),
            ));
        }
        Ok(root)
    }

    fn open_file(&mut self, path: &str, flags: OpenFlags) -> EngineResult<FileDescriptor> {
        let full_path = self.resolve_path(path)?;

        if full_path.is_dir() {
            return Err((
                NtStatus::FileIsADirectory,
                format!("{} is a directory", path),
            ));
        }
        let disposition = flags.create_disposition();
        let modifies = disposition.truncates() || (disposition.creates() && !full_path.exists());
        if (flags.wants_write() || modifies) && self.config.read_only {
            return Err((
                NtStatus::AccessDenied,
                format!("share is read-only: {}", path),
            ));
        }

        // The OS needs write access to create or truncate; `writable` still
        // follows the caller's access mode.
        let os_write = flags.wants_write() || disposition.creates() || disposition.truncates();
        let mut options = OpenOptions::new();
        options.read(flags.wants_read()).write(os_write);
        match disposition {
            CreateDisposition::Create => {
                options.create_new(true);
            }
            CreateDisposition::OpenIf => {
                options.create(true);
            }
            CreateDisposition::OverwriteIf => {
                options.create(true).truncate(true);
            }
            CreateDisposition::Overwrite => {
                options.truncate(true);
            }
            CreateDisposition::Open => {}
        }

        let file = options.open(&full_path).map_err(|e| io_failure(path, &e))?;
        debug!("Opened {:?} with {:?} ({:?})", full_path, flags, disposition);

        let id = self.allocate_id();
        self.files.insert(
            id,
            OpenFile {
                path: full_path,
                file,
                offset: 0,
                writable: flags.wants_write(),
                append: flags.contains(OpenFlags::APPEND),
            },
        );
        Ok(FileDescriptor::new(id))
    }

    fn open_listing(&mut self, path: &str) -> EngineResult<DirDescriptor> {
        let full_path = self.resolve_path(path)?;
        if !full_path.exists() {
            return Err((
                NtStatus::ObjectNameNotFound,
                format!("no such file or directory: {}", path),
            ));
        }
        if !full_path.is_dir() {
            return Err((NtStatus::NotADirectory, format!("{} is not a directory", path)));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full_path).map_err(|e| io_failure(path, &e))? {
            let entry = entry.map_err(|e| io_failure(path, &e))?;
            let metadata = entry.metadata().map_err(|e| io_failure(path, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let attributes = metadata_to_raw(&name, &metadata);
            entries.push(DirEntry { name, attributes });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} entries in directory {}", entries.len(), path);

        let id = self.allocate_id();
        self.dirs.insert(
            id,
            Listing {
                entries: entries.into(),
            },
        );
        Ok(DirDescriptor::new(id))
    }

    fn open_entry(&mut self, fd: FileDescriptor) -> EngineResult<&mut OpenFile> {
        self.files.get_mut(&fd.id()).ok_or_else(|| {
            (
                NtStatus::InvalidHandle,
                format!("invalid file descriptor {}", fd.id()),
            )
        })
    }

    fn stat_file(&mut self, fd: FileDescriptor) -> EngineResult<RawAttributes> {
        let open = self.open_entry(fd)?;
        let metadata = open
            .file
            .metadata()
            .map_err(|e| io_failure(&open.path.to_string_lossy(), &e))?;
        let name = open
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(metadata_to_raw(&name, &metadata))
    }

    fn read_file(&mut self, fd: FileDescriptor, buf: &mut [u8], offset: u64) -> EngineResult<usize> {
        let open = self.open_entry(fd)?;
        let path = open.path.to_string_lossy().into_owned();
        open.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| io_failure(&path, &e))?;

        let mut total = 0;
        while total < buf.len() {
            match open.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_failure(&path, &e)),
            }
        }
        Ok(total)
    }

    fn write_file(&mut self, fd: FileDescriptor, buf: &[u8]) -> EngineResult<usize> {
        let open = self.open_entry(fd)?;
        let path = open.path.to_string_lossy().into_owned();
        if !open.writable {
            return Err((
                NtStatus::AccessDenied,
                format!("{} is not open for writing", path),
            ));
        }
        if buf.is_empty() {
            return Err((NtStatus::InvalidParameter, "empty write".to_string()));
        }

        let offset = if open.append {
            open.file
                .metadata()
                .map_err(|e| io_failure(&path, &e))?
                .len()
        } else {
            open.offset
        };
        open.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| io_failure(&path, &e))?;
        open.file.write_all(buf).map_err(|e| io_failure(&path, &e))?;
        open.offset = offset + buf.len() as u64;
        Ok(buf.len())
    }

    fn seek_file(&mut self, fd: FileDescriptor, offset: i64, whence: Whence) -> EngineResult<u64> {
        let open = self.open_entry(fd)?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => open.offset as i64,
            Whence::End => {
                let len = open
                    .file
                    .metadata()
                    .map_err(|e| io_failure(&open.path.to_string_lossy(), &e))?
                    .len();
                len as i64
            }
        };
        let target = base.checked_add(offset).filter(|t| *t >= 0).ok_or_else(|| {
            (
                NtStatus::InvalidParameter,
                format!("invalid seek to {} from {:?}", offset, whence),
            )
        })?;
        open.offset = target as u64;
        Ok(open.offset)
    }
}

impl ProtocolEngine for LocalEngine {
    fn set_credentials(&mut self, credentials: &Credentials) {
        self.credentials = credentials.clone();
    }

    fn connect_share(&mut self, host: &str, share: &str, user: &str) -> NtStatus {
        match self.check_connect(host, share, user) {
            Ok(root) => {
                info!("Connected to \\\\{}\\{} as {} ({:?})", host, share, user, root);
                self.root = Some(root);
                NtStatus::Success
            }
            Err(failure) => {
                let status = failure.0;
                self.fail(failure);
                status
            }
        }
    }

    fn disconnect_share(&mut self) {
        if self.root.take().is_some() {
            debug!(
                "Disconnecting share, dropping {} files and {} listings",
                self.files.len(),
                self.dirs.len()
            );
        }
        self.files.clear();
        self.dirs.clear();
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> Option<FileDescriptor> {
        match self.open_file(path, flags) {
            Ok(fd) => Some(fd),
            Err(failure) => {
                self.fail(failure);
                None
            }
        }
    }

    fn open_dir(&mut self, path: &str) -> Option<DirDescriptor> {
        match self.open_listing(path) {
            Ok(dir) => Some(dir),
            Err(failure) => {
                self.fail(failure);
                None
            }
        }
    }

    fn fstat(&mut self, fd: FileDescriptor) -> Option<RawAttributes> {
        match self.stat_file(fd) {
            Ok(raw) => Some(raw),
            Err(failure) => {
                self.fail(failure);
                None
            }
        }
    }

    fn read_at(&mut self, fd: FileDescriptor, buf: &mut [u8], offset: u64) -> i64 {
        match self.read_file(fd, buf, offset) {
            Ok(n) => n as i64,
            Err(failure) => {
                self.fail(failure);
                -1
            }
        }
    }

    fn write(&mut self, fd: FileDescriptor, buf: &[u8]) -> i64 {
        match self.write_file(fd, buf) {
            Ok(n) => n as i64,
            Err(failure) => {
                self.fail(failure);
                -1
            }
        }
    }

    fn seek(&mut self, fd: FileDescriptor, offset: i64, whence: Whence) -> i64 {
        match self.seek_file(fd, offset, whence) {
            Ok(pos) => pos as i64,
            Err(failure) => {
                self.fail(failure);
                -1
            }
        }
    }

    fn read_dir_entry(&mut self, dir: DirDescriptor) -> Option<DirEntry> {
        self.dirs.get_mut(&dir.id())?.entries.pop_front()
    }

    fn close_file(&mut self, fd: FileDescriptor) {
        if self.files.remove(&fd.id()).is_none() {
            self.fail((
                NtStatus::InvalidHandle,
                format!("close of unknown file descriptor {}", fd.id()),
            ));
        }
    }

    fn close_dir(&mut self, dir: DirDescriptor) {
        if self.dirs.remove(&dir.id()).is_none() {
            self.fail((
                NtStatus::InvalidHandle,
                format!("close of unknown directory descriptor {}", dir.id()),
            ));
        }
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }
}

fn io_failure(path: &str, err: &io::Error) -> (NtStatus, String) {
    (NtStatus::from_io_error(err), format!("{}: {}", path, err))
}

fn unix_secs(time: io::Result<SystemTime>) -> u64 {
    time.unwrap_or(UNIX_EPOCH)
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Convert std Metadata into the engine's stat record
fn metadata_to_raw(name: &str, metadata: &Metadata) -> RawAttributes {
    let mut attributes = FileAttributes::empty();
    if metadata.is_dir() {
        attributes |= FileAttributes::DIRECTORY;
    }
    if metadata.permissions().readonly() {
        attributes |= FileAttributes::READONLY;
    }
    if name.starts_with('.') {
        attributes |= FileAttributes::HIDDEN;
    }
    if attributes.is_empty() {
        attributes = FileAttributes::NORMAL;
    }

    let modified = unix_secs(metadata.modified());
    RawAttributes {
        attributes,
        file_id: file_id(metadata),
        nlink: 1,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        allocation_size: metadata.len(),
        atime: unix_secs(metadata.accessed()),
        mtime: modified,
        ctime: modified,
        btime: unix_secs(metadata.created()),
    }
}

#[cfg(unix)]
fn file_id(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_id(_metadata: &Metadata) -> u64 {
    0
}
