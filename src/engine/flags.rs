//! Open flags and the SMB2 access/disposition values they project to

use bitflags::bitflags;

bitflags! {
    /// File attributes as defined in MS-FSCC
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u32 {
        const READONLY            = 0x00000001;
        const HIDDEN              = 0x00000002;
        const SYSTEM              = 0x00000004;
        const DIRECTORY           = 0x00000010;
        const ARCHIVE             = 0x00000020;
        const NORMAL              = 0x00000080;
        const TEMPORARY           = 0x00000100;
        const SPARSE_FILE         = 0x00000200;
        const REPARSE_POINT       = 0x00000400;
        const COMPRESSED          = 0x00000800;
        const OFFLINE             = 0x00001000;
        const NOT_CONTENT_INDEXED = 0x00002000;
        const ENCRYPTED           = 0x00004000;
    }
}

bitflags! {
    /// File access rights
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DesiredAccess: u32 {
        const DELETE                   = 0x00010000;
        const READ_CONTROL             = 0x00020000;
        const SYNCHRONIZE              = 0x00100000;

        const FILE_READ_DATA           = 0x00000001;
        const FILE_WRITE_DATA          = 0x00000002;
        const FILE_APPEND_DATA         = 0x00000004;
        const FILE_READ_EA             = 0x00000008;
        const FILE_WRITE_EA            = 0x00000010;
        const FILE_READ_ATTRIBUTES     = 0x00000080;
        const FILE_WRITE_ATTRIBUTES    = 0x00000100;

        const FILE_GENERIC_READ        = Self::SYNCHRONIZE.bits() |
                                         Self::FILE_READ_DATA.bits() |
                                         Self::FILE_READ_ATTRIBUTES.bits() |
                                         Self::FILE_READ_EA.bits() |
                                         Self::READ_CONTROL.bits();

        const FILE_GENERIC_WRITE       = Self::SYNCHRONIZE.bits() |
                                         Self::FILE_WRITE_DATA.bits() |
                                         Self::FILE_WRITE_ATTRIBUTES.bits() |
                                         Self::FILE_WRITE_EA.bits() |
                                         Self::FILE_APPEND_DATA.bits() |
                                         Self::READ_CONTROL.bits();
    }
}

/// Create disposition values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CreateDisposition {
    /// If file exists, open. If file doesn't exist, fail.
    Open = 0x00000001,
    /// If file exists, fail. If file doesn't exist, create.
    Create = 0x00000002,
    /// If file exists, open. If file doesn't exist, create.
    OpenIf = 0x00000003,
    /// If file exists, overwrite. If file doesn't exist, fail.
    Overwrite = 0x00000004,
    /// If file exists, overwrite. If file doesn't exist, create.
    OverwriteIf = 0x00000005,
}

impl CreateDisposition {
    /// Whether a missing file gets created
    pub fn creates(self) -> bool {
        matches!(
            self,
            CreateDisposition::Create | CreateDisposition::OpenIf | CreateDisposition::OverwriteIf
        )
    }

    /// Whether an existing file is truncated
    pub fn truncates(self) -> bool {
        matches!(
            self,
            CreateDisposition::Overwrite | CreateDisposition::OverwriteIf
        )
    }
}

bitflags! {
    /// POSIX-style open mode accepted by `Session::open_file`
    ///
    /// The empty set opens read-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        const WRITE_ONLY = 0o1;
        const READ_WRITE = 0o2;
        const CREATE     = 0o100;
        const EXCLUSIVE  = 0o200;
        const TRUNCATE   = 0o1000;
        const APPEND     = 0o2000;
    }
}

impl OpenFlags {
    pub const READ_ONLY: OpenFlags = OpenFlags::empty();

    /// Build from a raw POSIX mode, ignoring unknown bits
    pub fn from_mode(mode: u32) -> Self {
        OpenFlags::from_bits_truncate(mode)
    }

    /// Access rights requested on the wire for these flags
    pub fn desired_access(self) -> DesiredAccess {
        let mut access = if self.contains(OpenFlags::READ_WRITE) {
            DesiredAccess::FILE_GENERIC_READ | DesiredAccess::FILE_GENERIC_WRITE
        } else if self.contains(OpenFlags::WRITE_ONLY) {
            DesiredAccess::FILE_GENERIC_WRITE
        } else {
            DesiredAccess::FILE_GENERIC_READ
        };
        if self.contains(OpenFlags::APPEND) {
            access.remove(DesiredAccess::FILE_WRITE_DATA);
            access.insert(DesiredAccess::FILE_APPEND_DATA);
        }
        access
    }

    /// Create disposition for these flags
    pub fn create_disposition(self) -> CreateDisposition {
        let create = self.contains(OpenFlags::CREATE);
        let truncate = self.contains(OpenFlags::TRUNCATE);
        match (create, truncate) {
            (true, _) if self.contains(OpenFlags::EXCLUSIVE) => CreateDisposition::Create,
            (true, true) => CreateDisposition::OverwriteIf,
            (true, false) => CreateDisposition::OpenIf,
            (false, true) => CreateDisposition::Overwrite,
            (false, false) => CreateDisposition::Open,
        }
    }

    /// Whether the open needs write access
    pub fn wants_write(self) -> bool {
        self.desired_access()
            .intersects(DesiredAccess::FILE_WRITE_DATA | DesiredAccess::FILE_APPEND_DATA)
    }

    /// Whether the open needs read access
    pub fn wants_read(self) -> bool {
        self.desired_access().contains(DesiredAccess::FILE_READ_DATA)
    }
}
