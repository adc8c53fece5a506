//! Recording engine for observing how the session drives its engine
//!
//! Wraps a [`LocalEngine`] and logs every call into a shared [`Probe`]
//! that outlives the engine, so tests can check teardown after the session
//! has destroyed it.

use crate::engine::{
    Credentials, DirDescriptor, DirEntry, FileDescriptor, LocalEngine, OpenFlags, ProtocolEngine,
    RawAttributes, Whence,
};
use crate::error::NtStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetCredentials(String),
    ConnectShare(String, String),
    DisconnectShare,
    Open(String),
    OpenDir(String),
    Fstat,
    ReadAt(u64),
    Write(usize),
    Seek(i64, Whence),
    ReadDirEntry,
    CloseFile,
    CloseDir,
    Destroy,
}

#[derive(Default)]
struct ProbeInner {
    calls: Mutex<Vec<Call>>,
    write_failure: Mutex<Option<String>>,
    read_failure: Mutex<Option<String>>,
    read_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Shared view of the calls made on a [`RecordingEngine`]
#[derive(Clone, Default)]
pub struct Probe {
    inner: Arc<ProbeInner>,
}

impl Probe {
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn count_matching(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Make every write fail with `message` as the engine error text
    pub fn fail_writes_with(&self, message: &str) {
        *self.inner.write_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Make every positioned read fail with `message` as the engine error text
    pub fn fail_reads_with(&self, message: &str) {
        *self.inner.read_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Hold each positioned read for `delay`
    pub fn slow_reads(&self, delay: Duration) {
        *self.inner.read_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of engine calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight { probe: self }
    }
}

struct InFlight<'a> {
    probe: &'a Probe,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.probe.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Engine double that delegates to a [`LocalEngine`]
pub struct RecordingEngine {
    inner: LocalEngine,
    probe: Probe,
    injected_error: Option<String>,
}

impl RecordingEngine {
    pub fn new(inner: LocalEngine) -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                inner,
                probe: probe.clone(),
                injected_error: None,
            },
            probe,
        )
    }
}

impl ProtocolEngine for RecordingEngine {
    fn set_credentials(&mut self, credentials: &Credentials) {
        let _guard = self.probe.enter();
        self.probe
            .record(Call::SetCredentials(credentials.username.clone()));
        self.inner.set_credentials(credentials);
    }

    fn connect_share(&mut self, host: &str, share: &str, user: &str) -> NtStatus {
        let _guard = self.probe.enter();
        self.probe
            .record(Call::ConnectShare(host.to_string(), share.to_string()));
        self.inner.connect_share(host, share, user)
    }

    fn disconnect_share(&mut self) {
        let _guard = self.probe.enter();
        self.probe.record(Call::DisconnectShare);
        self.inner.disconnect_share();
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> Option<FileDescriptor> {
        let _guard = self.probe.enter();
        self.probe.record(Call::Open(path.to_string()));
        self.inner.open(path, flags)
    }

    fn open_dir(&mut self, path: &str) -> Option<DirDescriptor> {
        let _guard = self.probe.enter();
        self.probe.record(Call::OpenDir(path.to_string()));
        self.inner.open_dir(path)
    }

    fn fstat(&mut self, fd: FileDescriptor) -> Option<RawAttributes> {
        let _guard = self.probe.enter();
        self.probe.record(Call::Fstat);
        self.inner.fstat(fd)
    }

    fn read_at(&mut self, fd: FileDescriptor, buf: &mut [u8], offset: u64) -> i64 {
        let _guard = self.probe.enter();
        self.probe.record(Call::ReadAt(offset));
        let delay = *self.probe.inner.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let failure = self.probe.inner.read_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            self.injected_error = Some(message);
            return -1;
        }
        self.injected_error = None;
        self.inner.read_at(fd, buf, offset)
    }

    fn write(&mut self, fd: FileDescriptor, buf: &[u8]) -> i64 {
        let _guard = self.probe.enter();
        self.probe.record(Call::Write(buf.len()));
        let failure = self.probe.inner.write_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            self.injected_error = Some(message);
            return -1;
        }
        self.injected_error = None;
        self.inner.write(fd, buf)
    }

    fn seek(&mut self, fd: FileDescriptor, offset: i64, whence: Whence) -> i64 {
        let _guard = self.probe.enter();
        self.probe.record(Call::Seek(offset, whence));
        self.inner.seek(fd, offset, whence)
    }

    fn read_dir_entry(&mut self, dir: DirDescriptor) -> Option<DirEntry> {
        let _guard = self.probe.enter();
        self.probe.record(Call::ReadDirEntry);
        self.inner.read_dir_entry(dir)
    }

    fn close_file(&mut self, fd: FileDescriptor) {
        let _guard = self.probe.enter();
        self.probe.record(Call::CloseFile);
        self.inner.close_file(fd);
    }

    fn close_dir(&mut self, dir: DirDescriptor) {
        let _guard = self.probe.enter();
        self.probe.record(Call::CloseDir);
        self.inner.close_dir(dir);
    }

    fn last_error(&self) -> String {
        self.injected_error
            .clone()
            .unwrap_or_else(|| self.inner.last_error())
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        self.probe.record(Call::Destroy);
    }
}
