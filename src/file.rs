//! File and directory handles bound to a session

use crate::engine::{DirDescriptor, DirEntry, FileDescriptor, ProtocolEngine, Whence};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::stat::FileInfo;
use std::fmt;
use std::io::{self, SeekFrom};
use std::sync::Arc;
use tracing::{debug, trace};

/// Engine descriptor held by an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Descriptor {
    File(FileDescriptor),
    Dir(DirDescriptor),
}

/// Directory listing that is closed when dropped
struct DirListing<'a> {
    engine: &'a mut (dyn ProtocolEngine + 'static),
    dir: DirDescriptor,
}

impl<'a> DirListing<'a> {
    fn open(engine: &'a mut (dyn ProtocolEngine + 'static), path: &str) -> Option<Self> {
        let dir = engine.open_dir(path)?;
        Some(Self { engine, dir })
    }

    fn next_entry(&mut self) -> Option<DirEntry> {
        self.engine.read_dir_entry(self.dir)
    }
}

impl Drop for DirListing<'_> {
    fn drop(&mut self) {
        self.engine.close_dir(self.dir);
    }
}

/// An open file or directory on an SMB share
///
/// Every operation that reaches the engine holds the owning session's
/// lock, so handles sharing a session never interleave engine calls.
/// Handle-local state (cursor, descriptor) is only mutated inside that
/// critical section.
///
/// A handle whose session has been disconnected stays safe to use: reads
/// report end of stream and other calls fail without touching the engine.
pub struct SmbFile {
    session: Arc<Session>,
    descriptor: Option<Descriptor>,
    path: String,
    pos: u64,
    info: FileInfo,
}

impl SmbFile {
    pub(crate) fn new(
        session: Arc<Session>,
        path: &str,
        descriptor: Descriptor,
        info: FileInfo,
    ) -> Self {
        Self {
            session,
            descriptor: Some(descriptor),
            path: path.to_string(),
            pos: 0,
            info,
        }
    }

    /// Path the handle was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cursor used by `read`
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }

    pub fn is_closed(&self) -> bool {
        self.descriptor.is_none()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn file_descriptor(&self) -> Option<FileDescriptor> {
        match self.descriptor {
            Some(Descriptor::File(fd)) => Some(fd),
            _ => None,
        }
    }

    /// Read at the cursor into `buf`
    ///
    /// Returns `Ok(0)` at end of file, on a closed or directory handle,
    /// once the session is gone, and when the engine reports a failure.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.session.lock();
        let (Some(fd), Some(engine)) = (self.file_descriptor(), state.engine_mut()) else {
            return Ok(0);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let n = engine.read_at(fd, buf, self.pos);
        if n <= 0 {
            trace!("Read of {} at {} returned {}", self.path, self.pos, n);
            return Ok(0);
        }

        let n = (n as usize).min(buf.len());
        self.pos += n as u64;
        Ok(n)
    }

    /// Write `buf` at the engine-side offset
    ///
    /// The read cursor is not moved. A dead handle yields
    /// [`Error::EndOfStream`]; a rejected write carries the engine's
    /// error text.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut state = self.session.lock();
        let (Some(fd), Some(engine)) = (self.file_descriptor(), state.engine_mut()) else {
            return Err(Error::EndOfStream);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let n = engine.write(fd, buf);
        if n <= 0 {
            return Err(Error::WriteFailed(engine.last_error()));
        }
        Ok(n as usize)
    }

    /// Move the cursor
    ///
    /// `End` is resolved against the size cached at open time and
    /// `Current` against the local read cursor; both are sent to the engine
    /// as absolute positions. `Current` ignores the engine-side write
    /// offset, so writes since the last seek do not move it.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let mut state = self.session.lock();
        let (Some(fd), Some(engine)) = (self.file_descriptor(), state.engine_mut()) else {
            return Err(Error::EndOfStream);
        };

        let offset = match pos {
            SeekFrom::Start(n) => i64::try_from(n)
                .map_err(|_| Error::InvalidParameter(format!("seek offset {} out of range", n)))?,
            SeekFrom::End(n) => clamp_i64(self.info.size()).saturating_add(n),
            SeekFrom::Current(n) => clamp_i64(self.pos).saturating_add(n),
        };

        let res = engine.seek(fd, offset, Whence::Start);
        if res < 0 {
            return Err(Error::SeekFailed(engine.last_error()));
        }
        self.pos = res as u64;
        Ok(self.pos)
    }

    /// List the directory at this handle's path
    ///
    /// Each call opens a fresh listing and starts from its first entry, so
    /// repeated calls with a positive `count` return the same page. A
    /// `count` of zero or less lists everything. An empty result is
    /// reported as [`Error::EndOfStream`].
    pub fn readdir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let mut state = self.session.lock();
        let limit = usize::try_from(count).ok().filter(|n| *n > 0);

        let mut infos = Vec::new();
        if let Some(engine) = state.engine_mut() {
            if let Some(mut listing) = DirListing::open(engine, &self.path) {
                while limit.map_or(true, |limit| infos.len() < limit) {
                    match listing.next_entry() {
                        Some(entry) => infos.push(FileInfo::from_raw(&entry.name, &entry.attributes)),
                        None => break,
                    }
                }
            }
        }

        if infos.is_empty() {
            return Err(Error::EndOfStream);
        }
        Ok(infos)
    }

    /// Metadata captured when the handle was opened
    pub fn stat(&self) -> &FileInfo {
        &self.info
    }

    /// Release the descriptor
    ///
    /// Best effort: always succeeds, and does nothing on a closed handle
    /// or once the session is gone.
    pub fn close(&mut self) -> Result<()> {
        let Some(descriptor) = self.descriptor else {
            return Ok(());
        };
        let mut state = self.session.lock();
        let Some(engine) = state.engine_mut() else {
            return Ok(());
        };

        match descriptor {
            Descriptor::File(fd) => engine.close_file(fd),
            Descriptor::Dir(dir) => engine.close_dir(dir),
        }
        debug!("Closed {}", self.path);
        self.descriptor = None;
        Ok(())
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Drop for SmbFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl fmt::Debug for SmbFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbFile")
            .field("path", &self.path)
            .field("descriptor", &self.descriptor)
            .field("pos", &self.pos)
            .field("info", &self.info)
            .finish()
    }
}

impl io::Read for SmbFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SmbFile::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for SmbFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SmbFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for SmbFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        SmbFile::seek(self, pos).map_err(io::Error::from)
    }
}
